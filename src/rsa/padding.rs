// Sentinel Block Framing
// Each plaintext block is 0xFF followed by up to k-1 data bytes, so the
// integer stays below n and big-endian export never drops leading data zeros

use super::bigint::{to_bytes, RsaBigInt};
use super::error::{RsaError, RsaResult};

/// Marker byte in front of every block
pub const SENTINEL: u8 = 0xFF;

/// Block size k = floor((bitlength(n) - 1) / 8) bytes, sentinel included.
///
/// Keys with k < 2 cannot carry data and are rejected.
pub fn block_size(n: &RsaBigInt) -> RsaResult<usize> {
    let bits = n.bits();
    let k = bits.saturating_sub(1) / 8;
    if k < 2 {
        return Err(RsaError::KeyTooSmall { bits });
    }
    usize::try_from(k).map_err(|_| RsaError::AllocationFailure { bytes: usize::MAX })
}

/// Empty block holding only the sentinel, with room for k bytes
pub fn new_block(k: usize) -> RsaResult<Vec<u8>> {
    let mut block = Vec::new();
    block
        .try_reserve_exact(k)
        .map_err(|_| RsaError::AllocationFailure { bytes: k })?;
    block.push(SENTINEL);
    Ok(block)
}

/// Data bytes of a decrypted block. `line` is only used for error reporting.
pub fn unpad_block(m: &RsaBigInt, k: usize, line: usize) -> RsaResult<Vec<u8>> {
    let mut bytes = to_bytes(m);
    if bytes.len() > k || bytes.first() != Some(&SENTINEL) {
        return Err(RsaError::CorruptBlock { line });
    }
    bytes.remove(0);
    Ok(bytes)
}
