// RSA Encryption Implementation
// Streams plaintext through sentinel framing, one hex ciphertext line per block

use std::io::{self, Read, Write};

use rayon::prelude::*;

use super::bigint::{from_bytes, to_hex};
use super::error::RsaResult;
use super::keygen::RsaPublicKey;
use super::padding::{block_size, new_block};
use crate::util::FileConfig;

/// Encrypt `reader` into `writer` with the default batch size
pub fn encrypt_file<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    public_key: &RsaPublicKey,
) -> RsaResult<()> {
    encrypt_file_with(reader, writer, public_key, &FileConfig::default())
}

/// Verify the key's owner signature, then open the destination and encrypt.
///
/// `open_writer` is not called when verification fails, so an existing
/// destination is left untouched.
pub fn encrypt_file_for_owner<R, W, F>(
    reader: &mut R,
    open_writer: F,
    public_key: &RsaPublicKey,
    expected_owner: &str,
    config: &FileConfig,
) -> RsaResult<()>
where
    R: Read,
    W: Write,
    F: FnOnce() -> io::Result<W>,
{
    public_key.verify_owner(expected_owner)?;
    let mut writer = open_writer()?;
    encrypt_file_with(reader, &mut writer, public_key, config)
}

/// Encrypt `reader` into `writer`.
///
/// Reads k-1 bytes at a time until the source is exhausted, prefixes the
/// sentinel and writes hex(m^e mod n) per block. Blocks within a batch are
/// encrypted in parallel and written in input order.
pub fn encrypt_file_with<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    public_key: &RsaPublicKey,
    config: &FileConfig,
) -> RsaResult<()> {
    let k = block_size(&public_key.n)?;
    let data_len = (k - 1) as u64;
    let batch_blocks = config.batch_blocks.max(1);

    let mut total = 0usize;
    let mut exhausted = false;

    while !exhausted {
        let mut batch = Vec::with_capacity(batch_blocks);

        while batch.len() < batch_blocks {
            let mut block = new_block(k)?;
            let read = reader.by_ref().take(data_len).read_to_end(&mut block)?;
            if read == 0 {
                exhausted = true;
                break;
            }
            batch.push(block);
            if (read as u64) < data_len {
                exhausted = true;
                break;
            }
        }

        let lines: Vec<String> = batch
            .par_iter()
            .map(|block| {
                let c = public_key.encrypt(&from_bytes(block));
                format!("{}\n", to_hex(&c))
            })
            .collect();

        for line in &lines {
            writer.write_all(line.as_bytes())?;
        }
        total += lines.len();
    }

    writer.flush()?;
    log::debug!("encrypted {} blocks of up to {} bytes", total, k - 1);
    Ok(())
}
