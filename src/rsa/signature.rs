// RSA Signatures
// Textbook sign/verify and the owner-identity signature stored in public keys

use num_traits::Zero;

use super::bigint::{from_bytes, pow_mod, RsaBigInt};
use super::error::{RsaError, RsaResult};

/// s = m^d mod n
pub fn sign(m: &RsaBigInt, d: &RsaBigInt, n: &RsaBigInt) -> RsaBigInt {
    pow_mod(m, d, n)
}

/// True when s^e mod n == m
pub fn verify(m: &RsaBigInt, s: &RsaBigInt, e: &RsaBigInt, n: &RsaBigInt) -> bool {
    pow_mod(s, e, n) == *m
}

fn base62_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'Z' => Some(c - b'A' + 10),
        b'a'..=b'z' => Some(c - b'a' + 36),
        _ => None,
    }
}

/// Check an owner id can be stored as a single key file record
pub fn validate_owner_id(owner_id: &str) -> RsaResult<()> {
    if owner_id.is_empty() {
        return Err(RsaError::InvalidOwnerId("owner id is empty".to_string()));
    }
    if owner_id.contains(['\n', '\r']) {
        return Err(RsaError::InvalidOwnerId(format!(
            "owner id {:?} contains a line break",
            owner_id
        )));
    }
    Ok(())
}

/// Integer form of an owner id.
///
/// Ids made of `[0-9A-Za-z]` are read as base-62 numerals (`A`-`Z` are
/// 10..35, `a`-`z` are 36..61). Anything else is taken as the big-endian
/// integer of its UTF-8 bytes.
pub fn owner_id_to_biguint(owner_id: &str) -> RsaResult<RsaBigInt> {
    validate_owner_id(owner_id)?;

    let digits: Option<Vec<u8>> = owner_id.bytes().map(base62_digit).collect();
    let value = match digits {
        Some(digits) => digits
            .into_iter()
            .fold(RsaBigInt::zero(), |acc, d| acc * 62u8 + d),
        None => {
            log::warn!(
                "owner id {:?} is not base-62, signing its raw bytes",
                owner_id
            );
            from_bytes(owner_id.as_bytes())
        }
    };

    Ok(value)
}

/// Sign `owner_id` reduced modulo n
pub fn sign_owner(owner_id: &str, d: &RsaBigInt, n: &RsaBigInt) -> RsaResult<RsaBigInt> {
    let m = owner_id_to_biguint(owner_id)? % n;
    Ok(sign(&m, d, n))
}

/// Verify that `s` is the signature of `owner_id` under (e, n)
pub fn verify_owner(owner_id: &str, s: &RsaBigInt, e: &RsaBigInt, n: &RsaBigInt) -> RsaResult<()> {
    let m = owner_id_to_biguint(owner_id)? % n;
    if verify(&m, s, e, n) {
        Ok(())
    } else {
        Err(RsaError::SignatureVerificationFailed {
            owner: owner_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;

    // p = 61, q = 53
    fn textbook() -> (RsaBigInt, RsaBigInt, RsaBigInt) {
        (from_u64(3233), from_u64(17), from_u64(413))
    }

    #[test]
    fn test_sign_verify_all_messages() {
        let (n, e, d) = textbook();
        for m in 0..3233u64 {
            let m = from_u64(m);
            let s = sign(&m, &d, &n);
            assert!(verify(&m, &s, &e, &n));
        }
    }

    #[test]
    fn test_flipped_signature_bit_fails() {
        let (n, e, d) = textbook();
        for m in [2u64, 65, 1234, 3232] {
            let m = from_u64(m);
            let s = sign(&m, &d, &n);
            for bit in 0..n.bits() {
                let forged = &s ^ &(RsaBigInt::from(1u8) << bit);
                assert!(!verify(&m, &forged, &e, &n), "m = {}, bit = {}", m, bit);
            }
        }
    }

    #[test]
    fn test_owner_id_base62() {
        assert_eq!(owner_id_to_biguint("z").unwrap(), from_u64(61));
        assert_eq!(owner_id_to_biguint("Z").unwrap(), from_u64(35));
        assert_eq!(owner_id_to_biguint("10").unwrap(), from_u64(62));
        assert_eq!(owner_id_to_biguint("ab").unwrap(), from_u64(36 * 62 + 37));
    }

    #[test]
    fn test_owner_id_fallback_and_rejects() {
        assert_eq!(owner_id_to_biguint("a.b").unwrap(), from_bytes(b"a.b"));
        assert!(matches!(owner_id_to_biguint(""), Err(RsaError::InvalidOwnerId(_))));
        assert!(matches!(
            owner_id_to_biguint("al\nice"),
            Err(RsaError::InvalidOwnerId(_))
        ));
    }

    #[test]
    fn test_owner_signature() {
        let (n, e, d) = textbook();
        let s = sign_owner("alice", &d, &n).unwrap();
        assert!(verify_owner("alice", &s, &e, &n).is_ok());
        assert!(matches!(
            verify_owner("mallory", &s, &e, &n),
            Err(RsaError::SignatureVerificationFailed { .. })
        ));
    }
}
