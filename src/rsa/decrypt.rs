// RSA Decryption Implementation
// Reads hex ciphertext lines and strips the sentinel from each decrypted block

use std::io::{self, BufRead, Read, Write};

use rayon::prelude::*;

use super::bigint::{parse_hex, RsaBigInt};
use super::error::{RsaError, RsaResult};
use super::keygen::RsaPrivateKey;
use super::padding::{block_size, unpad_block};
use crate::util::FileConfig;

/// Decrypt `reader` into `writer` with the default batch size
pub fn decrypt_file<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    private_key: &RsaPrivateKey,
) -> RsaResult<()> {
    decrypt_file_with(reader, writer, private_key, &FileConfig::default())
}

/// Decrypt `reader` into `writer`.
///
/// Every ciphertext line must be newline-terminated lowercase or uppercase
/// hex below n. A failing line aborts the whole operation; output already
/// written for earlier batches is not valid plaintext in that case.
pub fn decrypt_file_with<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    private_key: &RsaPrivateKey,
    config: &FileConfig,
) -> RsaResult<()> {
    let k = block_size(&private_key.n)?;
    let batch_blocks = config.batch_blocks.max(1);
    // hex digits of n plus "\r\n"
    let max_line = private_key.n.bits().div_ceil(4) + 2;

    let mut line_no = 0usize;
    let mut exhausted = false;

    while !exhausted {
        let mut batch = Vec::with_capacity(batch_blocks);

        while batch.len() < batch_blocks {
            match read_ciphertext(reader, line_no + 1, &private_key.n, max_line)? {
                Some(c) => {
                    line_no += 1;
                    batch.push((line_no, c));
                }
                None => {
                    exhausted = true;
                    break;
                }
            }
        }

        let blocks = batch
            .par_iter()
            .map(|(line, c)| unpad_block(&private_key.decrypt(c), k, *line))
            .collect::<RsaResult<Vec<_>>>()?;

        for block in &blocks {
            writer.write_all(block)?;
        }
    }

    writer.flush()?;
    log::debug!("decrypted {} blocks", line_no);
    Ok(())
}

// None at a clean end of stream; at most `max_line` bytes are buffered
fn read_ciphertext<R: BufRead>(
    reader: &mut R,
    line: usize,
    n: &RsaBigInt,
    max_line: u64,
) -> RsaResult<Option<RsaBigInt>> {
    let mut text = String::new();
    let read = reader
        .by_ref()
        .take(max_line)
        .read_line(&mut text)
        .map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => RsaError::InvalidCiphertext {
                line,
                reason: "not valid UTF-8".to_string(),
            },
            _ => RsaError::Io(e),
        })?;

    if read == 0 {
        return Ok(None);
    }
    if !text.ends_with('\n') {
        if read as u64 >= max_line {
            return Err(RsaError::InvalidCiphertext {
                line,
                reason: format!("line is longer than {} bytes", max_line),
            });
        }
        return Err(RsaError::PrematureEndOfStream { line });
    }

    text.pop();
    if text.ends_with('\r') {
        text.pop();
    }

    let c = parse_hex(&text).ok_or_else(|| RsaError::InvalidCiphertext {
        line,
        reason: format!("{:?} is not a hex integer", text),
    })?;

    if &c >= n {
        return Err(RsaError::InvalidCiphertext {
            line,
            reason: "value is not below the modulus".to_string(),
        });
    }

    Ok(Some(c))
}
