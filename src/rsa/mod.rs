// RSA Module - Main module file
// Exports all RSA-related functionality

pub mod bigint;
pub mod cancel;
pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod keyfile;
pub mod keygen;
pub mod padding;
pub mod prime;
pub mod random;
pub mod signature;

pub use bigint::{gcd, mod_inverse, pow_mod, RsaBigInt};
pub use cancel::CancelToken;
pub use decrypt::{decrypt_file, decrypt_file_with};
pub use encrypt::{encrypt_file, encrypt_file_for_owner, encrypt_file_with};
pub use error::{RsaError, RsaResult};
pub use keyfile::{
    read_private_key, read_public_key, save_key_pair, write_private_key, write_public_key,
};
pub use keygen::{KeyGenerator, RsaKeyPair, RsaPrivateKey, RsaPublicKey};
pub use prime::{is_prime, make_prime};
pub use random::RandState;
pub use signature::{sign, verify};
