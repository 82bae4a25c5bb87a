// RSA Key Generation
// Derives (n, e, d) from two random primes and signs the owner identity

use num_traits::One;

use super::bigint::{gcd, mod_inverse, pow_mod, reserve_bits, RsaBigInt};
use super::cancel::CancelToken;
use super::error::{RsaError, RsaResult};
use super::prime::make_prime_cancellable;
use super::random::RandState;
use super::signature::{sign_owner, validate_owner_id, verify_owner};

/// Smallest modulus size for which a block carries at least one data byte
pub const MIN_MODULUS_BITS: u64 = 16;

/// RSA Public Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub n: RsaBigInt,        // Modulus
    pub e: RsaBigInt,        // Public exponent
    pub s: RsaBigInt,        // Signature of owner_id
    pub owner_id: String,
}

/// RSA Private Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    pub n: RsaBigInt, // Modulus (same as public)
    pub d: RsaBigInt, // Private exponent
}

/// RSA Key Pair (both public and private keys)
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
}

impl RsaPublicKey {
    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }

    /// c = m^e mod n
    pub fn encrypt(&self, m: &RsaBigInt) -> RsaBigInt {
        pow_mod(m, &self.e, &self.n)
    }

    /// Check the embedded signature against the identity the caller expects
    pub fn verify_owner(&self, expected_owner: &str) -> RsaResult<()> {
        verify_owner(expected_owner, &self.s, &self.e, &self.n)
    }
}

impl RsaPrivateKey {
    /// Get the bit length of the modulus
    pub fn bit_length(&self) -> u64 {
        self.n.bits()
    }

    /// m = c^d mod n
    pub fn decrypt(&self, c: &RsaBigInt) -> RsaBigInt {
        pow_mod(c, &self.d, &self.n)
    }

    /// s = m^d mod n
    pub fn sign(&self, m: &RsaBigInt) -> RsaBigInt {
        pow_mod(m, &self.d, &self.n)
    }
}

/// Carmichael totient of n = p*q: (p-1)(q-1) / gcd(p-1, q-1)
pub fn carmichael_lambda(p: &RsaBigInt, q: &RsaBigInt) -> RsaBigInt {
    let p_minus_1 = p - 1u8;
    let q_minus_1 = q - 1u8;
    let g = gcd(&p_minus_1, &q_minus_1);
    (&p_minus_1 * &q_minus_1) / g
}

impl RsaKeyPair {
    /// Build a key pair from known primes and public exponent.
    ///
    /// Fails with [`RsaError::NoModularInverse`] when e is not invertible
    /// modulo λ(n).
    pub fn from_primes(
        p: &RsaBigInt,
        q: &RsaBigInt,
        e: &RsaBigInt,
        owner_id: &str,
    ) -> RsaResult<Self> {
        let two = RsaBigInt::from(2u8);
        if p < &two || q < &two || p == q {
            return Err(RsaError::InvalidParameter(
                "p and q must be distinct primes".to_string(),
            ));
        }
        validate_owner_id(owner_id)?;

        let n = p * q;
        let lambda = carmichael_lambda(p, q);
        let d = mod_inverse(e, &lambda)?;
        let s = sign_owner(owner_id, &d, &n)?;

        log::debug!("p ({} bits): {}", p.bits(), p);
        log::debug!("q ({} bits): {}", q.bits(), q);
        log::debug!("n - modulus ({} bits): {}", n.bits(), n);
        log::debug!("e - public exponent ({} bits): {}", e.bits(), e);
        log::debug!("d - private exponent ({} bits): {}", d.bits(), d);
        log::debug!("user signature ({} bits): {}", s.bits(), s);

        Ok(Self {
            public_key: RsaPublicKey {
                n: n.clone(),
                e: e.clone(),
                s,
                owner_id: owner_id.to_string(),
            },
            private_key: RsaPrivateKey { n, d },
        })
    }

    /// Get the bit length of the key
    pub fn bit_length(&self) -> u64 {
        self.public_key.bit_length()
    }
}

/// Key generation parameters
#[derive(Clone, Debug)]
pub struct KeyGenerator {
    /// requested modulus size
    pub nbits: u64,
    /// Miller-Rabin rounds per candidate
    pub iters: u64,
    cancel: CancelToken,
}

impl KeyGenerator {
    pub fn new(nbits: u64, iters: u64) -> Self {
        Self {
            nbits,
            iters,
            cancel: CancelToken::new(),
        }
    }

    /// Stop the prime and exponent searches when `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Generate a key pair whose public half carries a signature of `owner_id`.
    ///
    /// The output depends only on `nbits`, `iters` and the state of `rng`.
    pub fn generate(&self, owner_id: &str, rng: &mut RandState) -> RsaResult<RsaKeyPair> {
        if self.nbits < MIN_MODULUS_BITS {
            return Err(RsaError::InvalidParameter(format!(
                "modulus must have at least {} bits, got {}",
                MIN_MODULUS_BITS, self.nbits
            )));
        }
        validate_owner_id(owner_id)?;
        // n and e both take nbits
        reserve_bits(self.nbits)?;

        let nbits = self.nbits;
        let pbits = nbits / 4 + rng.random_below_u64(nbits / 2);
        let qbits = nbits - pbits;
        log::debug!("splitting {} bits into p: {} + 1, q: {} + 1", nbits, pbits, qbits);

        let p = make_prime_cancellable(pbits + 1, self.iters, rng, &self.cancel)?;
        let mut q = make_prime_cancellable(qbits + 1, self.iters, rng, &self.cancel)?;
        while q == p {
            q = make_prime_cancellable(qbits + 1, self.iters, rng, &self.cancel)?;
        }

        let lambda = carmichael_lambda(&p, &q);
        let e = self.find_exponent(&lambda, rng)?;

        RsaKeyPair::from_primes(&p, &q, &e, owner_id)
    }

    // random nbits-bit e with 1 < e < λ(n) and gcd(e, λ(n)) = 1
    fn find_exponent(&self, lambda: &RsaBigInt, rng: &mut RandState) -> RsaResult<RsaBigInt> {
        let mut attempts = 0u64;
        loop {
            self.cancel.check()?;
            attempts += 1;

            let e = rng.random_bits(self.nbits);
            if e > RsaBigInt::one() && &e < lambda && gcd(&e, lambda).is_one() {
                log::trace!("public exponent found after {} candidates", attempts);
                return Ok(e);
            }
        }
    }
}
