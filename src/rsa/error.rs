// RSA Errors
// Error kinds surfaced by key generation, key files and the block codec

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RsaError {
    #[error("no modular inverse exists: operands are not coprime")]
    NoModularInverse,

    #[error("malformed key file: {0}")]
    MalformedKeyFile(String),

    #[error("premature end of ciphertext stream at line {line}")]
    PrematureEndOfStream { line: usize },

    #[error("invalid ciphertext at line {line}: {reason}")]
    InvalidCiphertext { line: usize, reason: String },

    #[error("corrupt block at line {line}: missing sentinel or oversized block (wrong key?)")]
    CorruptBlock { line: usize },

    #[error("failed to allocate {bytes} bytes")]
    AllocationFailure { bytes: usize },

    #[error("signature verification failed for owner `{owner}`")]
    SignatureVerificationFailed { owner: String },

    #[error("invalid owner id: {0}")]
    InvalidOwnerId(String),

    #[error("modulus of {bits} bits is too small to carry any data per block")]
    KeyTooSmall { bits: u64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for RSA operations
pub type RsaResult<T> = Result<T, RsaError>;
