// RSA Key Files
// Line-oriented hex text format for public and private keys
//
// public:  hex(n) \n hex(e) \n hex(s) \n owner_id \n
// private: hex(n) \n hex(d) \n

use std::io::{self, BufRead, Write};
use std::path::Path;

use super::bigint::{parse_hex, to_hex, RsaBigInt};
use super::error::{RsaError, RsaResult};
use super::keygen::{RsaKeyPair, RsaPrivateKey, RsaPublicKey};
use super::signature::validate_owner_id;
use crate::util::{create_private_key_file, open_output};

/// Write a public key as four newline-terminated records
pub fn write_public_key<W: Write>(key: &RsaPublicKey, writer: &mut W) -> RsaResult<()> {
    validate_owner_id(&key.owner_id)?;
    write!(
        writer,
        "{}\n{}\n{}\n{}\n",
        to_hex(&key.n),
        to_hex(&key.e),
        to_hex(&key.s),
        key.owner_id
    )?;
    writer.flush()?;
    Ok(())
}

/// Read a public key written by [`write_public_key`]
pub fn read_public_key<R: BufRead>(reader: &mut R) -> RsaResult<RsaPublicKey> {
    let n = read_modulus(reader)?;
    let e = read_hex_record(reader, "public exponent")?;
    let s = read_hex_record(reader, "signature")?;
    let owner_id = read_record(reader, "owner id")?;

    Ok(RsaPublicKey { n, e, s, owner_id })
}

/// Write a private key as two newline-terminated records
pub fn write_private_key<W: Write>(key: &RsaPrivateKey, writer: &mut W) -> RsaResult<()> {
    write!(writer, "{}\n{}\n", to_hex(&key.n), to_hex(&key.d))?;
    writer.flush()?;
    Ok(())
}

/// Read a private key written by [`write_private_key`]
pub fn read_private_key<R: BufRead>(reader: &mut R) -> RsaResult<RsaPrivateKey> {
    let n = read_modulus(reader)?;
    let d = read_hex_record(reader, "private exponent")?;

    Ok(RsaPrivateKey { n, d })
}

/// Write both halves of `keypair`, the private key with owner-only permissions.
///
/// The public key file is removed again when the private key cannot be
/// written, so a public key never exists without its private half.
pub fn save_key_pair(keypair: &RsaKeyPair, public_path: &Path, private_path: &Path) -> RsaResult<()> {
    {
        let mut pbfile = open_output(Some(public_path))?;
        write_public_key(&keypair.public_key, &mut pbfile)?;
    }

    let written = create_private_key_file(private_path)
        .map_err(RsaError::from)
        .and_then(|mut pvfile| write_private_key(&keypair.private_key, &mut pvfile));

    if let Err(e) = written {
        if let Err(rm) = std::fs::remove_file(public_path) {
            log::warn!("cannot remove {}: {}", public_path.display(), rm);
        }
        return Err(e);
    }
    Ok(())
}

fn read_record<R: BufRead>(reader: &mut R, what: &str) -> RsaResult<String> {
    let mut line = String::new();
    let len = reader.read_line(&mut line).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => {
            RsaError::MalformedKeyFile(format!("{} record is not valid UTF-8", what))
        }
        _ => RsaError::Io(e),
    })?;

    if len == 0 {
        return Err(RsaError::MalformedKeyFile(format!("missing {} record", what)));
    }
    if !line.ends_with('\n') {
        return Err(RsaError::MalformedKeyFile(format!("truncated {} record", what)));
    }

    line.pop();
    if line.ends_with('\r') {
        line.pop();
    }
    if line.is_empty() {
        return Err(RsaError::MalformedKeyFile(format!("empty {} record", what)));
    }

    Ok(line)
}

fn read_hex_record<R: BufRead>(reader: &mut R, what: &str) -> RsaResult<RsaBigInt> {
    let record = read_record(reader, what)?;
    parse_hex(&record).ok_or_else(|| {
        RsaError::MalformedKeyFile(format!("{} record {:?} is not hex", what, record))
    })
}

fn read_modulus<R: BufRead>(reader: &mut R) -> RsaResult<RsaBigInt> {
    let n = read_hex_record(reader, "modulus")?;
    if n < RsaBigInt::from(2u8) {
        return Err(RsaError::MalformedKeyFile(format!("modulus {:x} is too small", n)));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;
    use std::io::Cursor;

    fn public_key() -> RsaPublicKey {
        RsaPublicKey {
            n: from_u64(3233),
            e: from_u64(17),
            s: from_u64(0x0abc),
            owner_id: "alice".to_string(),
        }
    }

    #[test]
    fn test_public_key_format() {
        let mut out = Vec::<u8>::new();
        write_public_key(&public_key(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ca1\n11\nabc\nalice\n");
    }

    #[test]
    fn test_public_key_roundtrip() {
        let key = public_key();
        let mut out = Vec::<u8>::new();
        write_public_key(&key, &mut out).unwrap();

        let read = read_public_key(&mut Cursor::new(out)).unwrap();
        assert_eq!(read, key);
    }

    #[test]
    fn test_private_key_roundtrip() {
        let key = RsaPrivateKey {
            n: from_u64(3233),
            d: from_u64(413),
        };
        let mut out = Vec::<u8>::new();
        write_private_key(&key, &mut out).unwrap();
        assert_eq!(out, b"ca1\n19d\n");

        let read = read_private_key(&mut Cursor::new(out)).unwrap();
        assert_eq!(read, key);
    }

    #[test]
    fn test_crlf_tolerated() {
        let read = read_private_key(&mut Cursor::new(&b"ca1\r\n19d\r\n"[..])).unwrap();
        assert_eq!(read.d, from_u64(413));
    }

    #[test]
    fn test_malformed_public_keys() {
        let cases: &[&[u8]] = &[
            b"",
            b"ca1\n",
            b"ca1\n11\nabc\n",
            b"ca1\n11\nabc\nalice",
            b"ca1\n11\n\nalice\n",
            b"ca1\nzz\nabc\nalice\n",
            b"0x1f\n11\nabc\nalice\n",
            b"1\n11\nabc\nalice\n",
            b"ca1\n11\nabc\n\n",
            b"ca1\n11\nabc\n\xff\xfe\n",
        ];

        for case in cases {
            let result = read_public_key(&mut Cursor::new(*case));
            assert!(
                matches!(result, Err(RsaError::MalformedKeyFile(_))),
                "{:?} -> {:?}",
                String::from_utf8_lossy(case),
                result
            );
        }
    }

    #[test]
    fn test_malformed_private_keys() {
        for case in [&b"ca1"[..], &b"ca1\n"[..], &b"ca1\n19d"[..], &b"ca1\n-19d\n"[..]] {
            assert!(matches!(
                read_private_key(&mut Cursor::new(case)),
                Err(RsaError::MalformedKeyFile(_))
            ));
        }
    }

    #[test]
    fn test_write_rejects_multiline_owner() {
        let mut key = public_key();
        key.owner_id = "alice\nbob".to_string();
        assert!(matches!(
            write_public_key(&key, &mut Vec::<u8>::new()),
            Err(RsaError::InvalidOwnerId(_))
        ));
    }

    #[test]
    fn test_save_key_pair() {
        let keypair = RsaKeyPair::from_primes(&from_u64(61), &from_u64(53), &from_u64(17), "alice").unwrap();
        let dir = std::env::temp_dir();
        let id = std::process::id();
        let public_path = dir.join(format!("rsa_tool_save_{}.pub", id));
        let private_path = dir.join(format!("rsa_tool_save_{}.priv", id));

        save_key_pair(&keypair, &public_path, &private_path).unwrap();
        let public_key = read_public_key(&mut io::BufReader::new(std::fs::File::open(&public_path).unwrap())).unwrap();
        let private_key = read_private_key(&mut io::BufReader::new(std::fs::File::open(&private_path).unwrap())).unwrap();
        assert_eq!(public_key, keypair.public_key);
        assert_eq!(private_key, keypair.private_key);

        std::fs::remove_file(&public_path).unwrap();
        std::fs::remove_file(&private_path).unwrap();
    }

    #[test]
    fn test_save_key_pair_leaves_no_orphan_public_key() {
        let keypair = RsaKeyPair::from_primes(&from_u64(61), &from_u64(53), &from_u64(17), "alice").unwrap();
        let dir = std::env::temp_dir();
        let id = std::process::id();
        let public_path = dir.join(format!("rsa_tool_orphan_{}.pub", id));
        let private_path = dir.join(format!("rsa_tool_missing_dir_{}", id)).join("rsa.priv");

        let result = save_key_pair(&keypair, &public_path, &private_path);
        assert!(matches!(result, Err(RsaError::Io(_))));
        assert!(!public_path.exists());
    }
}
