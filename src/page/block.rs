//! Block arithmetic
//!
//! Payloads are stored in whole blocks. Anything shorter than a block
//! boundary is zero-extended; the unpadded length is not recorded.

/// Number of blocks needed to hold `len` bytes
pub fn blocks_for(len: usize, block_size: usize) -> usize {
    len.div_ceil(block_size)
}

/// Zero-extend `data` to the next multiple of `block_size`
///
/// Empty input stays empty.
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    pad_to(data, blocks_for(data.len(), block_size) * block_size)
}

/// Zero-extend `data` to exactly `len` bytes (never truncates)
pub fn pad_to(data: &[u8], len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(len.max(data.len()));
    buf.extend_from_slice(data);
    if buf.len() < len {
        buf.resize(len, 0);
    }
    buf
}

/// Split `data` into `block_size` chunks, zero-padding the last one
pub fn split(data: &[u8], block_size: usize) -> Vec<Vec<u8>> {
    data.chunks(block_size)
        .map(|chunk| pad_to(chunk, block_size))
        .collect()
}
