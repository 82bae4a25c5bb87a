// RSA Big Integer Operations
// Modular arithmetic over num-bigint plus the hex text form used by key files

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use super::error::{RsaError, RsaResult};

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Create a big integer from bytes (big-endian)
pub fn from_bytes(bytes: &[u8]) -> RsaBigInt {
    RsaBigInt::from_bytes_be(bytes)
}

/// Convert big integer to bytes (big-endian, no leading zero bytes)
pub fn to_bytes(n: &RsaBigInt) -> Vec<u8> {
    n.to_bytes_be()
}

/// Modular exponentiation: base^exp mod modulus
/// Uses square-and-multiply algorithm
///
/// Panics if `modulus` is zero.
pub fn pow_mod(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }

    let mut result = RsaBigInt::one();
    let mut base = base % modulus;
    let mut exp = exp.clone();

    while !exp.is_zero() {
        if exp.is_odd() {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exp >>= 1;
    }

    result
}

/// Greatest common divisor, iterative Euclid. gcd(a, 0) = a
pub fn gcd(a: &RsaBigInt, b: &RsaBigInt) -> RsaBigInt {
    let mut a = a.clone();
    let mut b = b.clone();

    while !b.is_zero() {
        let t = &a % &b;
        a = std::mem::replace(&mut b, t);
    }

    a
}

/// Compute modular inverse: the unique t in [0, n) with a*t = 1 (mod n)
///
/// Uses the extended Euclidean algorithm. Fails with
/// [`RsaError::NoModularInverse`] when gcd(a, n) != 1.
pub fn mod_inverse(a: &RsaBigInt, n: &RsaBigInt) -> RsaResult<RsaBigInt> {
    if n.is_zero() {
        return Err(RsaError::NoModularInverse);
    }

    let modulus = BigInt::from(n.clone());
    let (mut r, mut r_next) = (modulus.clone(), BigInt::from(a % n));
    let (mut t, mut t_next) = (BigInt::zero(), BigInt::one());

    while !r_next.is_zero() {
        let q = &r / &r_next;

        let r_new = &r - &q * &r_next;
        r = std::mem::replace(&mut r_next, r_new);

        let t_new = &t - &q * &t_next;
        t = std::mem::replace(&mut t_next, t_new);
    }

    if !r.is_one() {
        return Err(RsaError::NoModularInverse);
    }

    t.mod_floor(&modulus)
        .to_biguint()
        .ok_or(RsaError::NoModularInverse)
}

/// Lowercase hex with no prefix and no zero padding
pub fn to_hex(n: &RsaBigInt) -> String {
    format!("{:x}", n)
}

/// Parse a hex record. Returns None for empty input or non-hex characters.
pub fn parse_hex(s: &str) -> Option<RsaBigInt> {
    if s.is_empty() {
        return None;
    }

    // hex::decode wants whole bytes
    let bytes = if s.len() % 2 == 1 {
        hex::decode(format!("0{}", s))
    } else {
        hex::decode(s)
    };

    bytes.ok().map(|b| from_bytes(&b))
}

/// Fail with [`RsaError::AllocationFailure`] when a `bits`-bit integer
/// cannot be allocated, instead of aborting inside num-bigint.
pub fn reserve_bits(bits: u64) -> RsaResult<()> {
    let bytes = usize::try_from(bits.div_ceil(8))
        .map_err(|_| RsaError::AllocationFailure { bytes: usize::MAX })?;

    let mut scratch = Vec::<u8>::new();
    scratch
        .try_reserve_exact(bytes)
        .map_err(|_| RsaError::AllocationFailure { bytes })
}
