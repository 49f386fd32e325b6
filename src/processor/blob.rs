//! zlib compression for package sections.
//!
//! Decompression does not know the uncompressed size up front: it tries a
//! bounded output buffer of 4×, then 10×, then 20× the compressed size and
//! gives up after the third attempt.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use log::debug;

/// Inputs above this size are compressed with the fastest level.
pub const FAST_COMPRESSION_THRESHOLD: usize = 50 * 1024 * 1024;

/// Output-size multipliers tried in order by [`inflate`].
pub const INFLATE_FACTORS: [usize; 3] = [4, 10, 20];

/// Compress with the default level (fast level for very large inputs).
pub fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let level = if data.len() > FAST_COMPRESSION_THRESHOLD {
        Compression::fast()
    } else {
        Compression::default()
    };
    deflate_with(data, level)
}

pub fn deflate_with(data: &[u8], level: Compression) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Result of a single bounded decompression attempt.
enum Attempt {
    Done(Vec<u8>),
    BufferTooSmall,
    Corrupt,
}

fn inflate_bounded(input: &[u8], limit: usize) -> Attempt {
    let mut out = Vec::with_capacity(limit);
    let mut z = Decompress::new(true);
    match z.decompress_vec(input, &mut out, FlushDecompress::Finish) {
        Ok(Status::StreamEnd) => Attempt::Done(out),
        // Stopped without reaching the end: either the output bound was hit
        // or the input ran out.
        Ok(Status::Ok | Status::BufError) => {
            if out.len() == out.capacity() {
                Attempt::BufferTooSmall
            } else {
                Attempt::Corrupt
            }
        }
        Err(_) => Attempt::Corrupt,
    }
}

/// Decompress a zlib stream; `None` when it is corrupt or expands beyond
/// the largest bound.
pub fn inflate(input: &[u8]) -> Option<Vec<u8>> {
    if input.is_empty() {
        return None;
    }
    for factor in INFLATE_FACTORS {
        let limit = input.len().saturating_mul(factor);
        match inflate_bounded(input, limit) {
            Attempt::Done(out) => return Some(out),
            Attempt::BufferTooSmall => {
                debug!("inflate: {limit} bytes ({factor}x) too small, retrying");
            }
            Attempt::Corrupt => return None,
        }
    }
    None
}

/// Length in bytes of the complete zlib stream at the start of `input`,
/// or `None` if no complete stream is found there.
pub fn stream_len(input: &[u8]) -> Option<usize> {
    let mut z = Decompress::new(true);
    let mut sink = vec![0u8; 64 * 1024];
    loop {
        let consumed = z.total_in() as usize;
        let produced = z.total_out();
        let status = z
            .decompress(&input[consumed..], &mut sink, FlushDecompress::None)
            .ok()?;
        match status {
            Status::StreamEnd => return Some(z.total_in() as usize),
            _ if z.total_in() as usize == consumed && z.total_out() == produced => {
                return None;
            }
            _ => {}
        }
    }
}
