//! Block-wise raw DEFLATE.
//!
//! Large files are cut into [`PARALLEL_BLOCK_SIZE`] blocks that are
//! compressed independently. Each block after the first is primed with the
//! preceding [`WINDOW_SIZE`] bytes of plaintext as a preset dictionary, every
//! block but the last ends with a sync flush (byte-aligned, non-final), and
//! the last block finishes the stream. Concatenating the fragments in order
//! yields one valid DEFLATE stream that decompresses to the original input.
//!
//! # Example
//!
//! ```rust
//! use parzip::codec::BlockCompressor;
//!
//! let data = b"Hello, World! ".repeat(10_000);
//! let (first, second) = data.split_at(70_000);
//!
//! let compressor = BlockCompressor::new(6);
//! let mut stream = compressor.compress_block(first, None, false)?;
//! let window = &first[first.len() - parzip::codec::WINDOW_SIZE..];
//! stream.extend(compressor.compress_block(second, Some(window), true)?);
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;

use flate2::{Compress, Compression, FlushCompress, Status};

/// DEFLATE history window: 32 KiB.
pub const WINDOW_SIZE: usize = 32 * 1024;

/// Size of the blocks a large file is cut into: 1 MiB.
pub const PARALLEL_BLOCK_SIZE: usize = 1024 * 1024;

/// Files at least this large are compressed in parallel blocks: 6 MiB.
pub const MIN_PARALLEL_FILE_SIZE: u64 = PARALLEL_BLOCK_SIZE as u64 * 6;

/// Spare output space kept available between `compress_vec` calls.
const MIN_SPARE_OUTPUT: usize = 1024;

/// Compresses independent blocks of a raw DEFLATE stream.
#[derive(Debug, Clone, Copy)]
pub struct BlockCompressor {
    level: Compression,
}

impl Default for BlockCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl BlockCompressor {
    /// Creates a compressor for the given level (clamped to 0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    /// Returns the compression level.
    pub fn level(&self) -> u32 {
        self.level.level()
    }

    /// Compresses one block.
    ///
    /// `dictionary` is the plaintext immediately preceding `data`; only its
    /// last [`WINDOW_SIZE`] bytes are used. When `last` is false the output
    /// ends on a byte boundary without a final block, so another fragment
    /// can follow it.
    pub fn compress_block(
        &self,
        data: &[u8],
        dictionary: Option<&[u8]>,
        last: bool,
    ) -> io::Result<Vec<u8>> {
        let mut compress = Compress::new(self.level, false);
        if let Some(dictionary) = dictionary.filter(|d| !d.is_empty()) {
            let window = &dictionary[dictionary.len().saturating_sub(WINDOW_SIZE)..];
            compress.set_dictionary(window).map_err(io::Error::other)?;
        }

        let flush = if last {
            FlushCompress::Finish
        } else {
            FlushCompress::Sync
        };
        let mut output = Vec::with_capacity(data.len() / 2 + MIN_SPARE_OUTPUT);
        let mut input = data;

        loop {
            if output.capacity() - output.len() < MIN_SPARE_OUTPUT {
                output.reserve(output.capacity().max(4 * MIN_SPARE_OUTPUT));
            }
            let consumed_before = compress.total_in();
            let status = compress
                .compress_vec(input, &mut output, flush)
                .map_err(io::Error::other)?;
            let consumed = (compress.total_in() - consumed_before) as usize;
            input = &input[consumed..];

            match status {
                Status::StreamEnd => break,
                // A sync flush is complete once all input is taken and the
                // encoder stopped with output space to spare.
                Status::Ok | Status::BufError
                    if !last && input.is_empty() && output.len() < output.capacity() =>
                {
                    break;
                }
                Status::Ok | Status::BufError => {}
            }
        }

        Ok(output)
    }

    /// Compresses a complete buffer as a single finished stream.
    pub fn compress_all(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        self.compress_block(data, None, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn sample(len: usize) -> Vec<u8> {
        let words = ["alpha ", "beta ", "gamma ", "delta ", "epsilon\n"];
        let mut out = Vec::with_capacity(len + 8);
        let mut i = 0usize;
        while out.len() < len {
            out.extend_from_slice(words[(i * 7 + i / 3) % words.len()].as_bytes());
            i += 1;
        }
        out.truncate(len);
        out
    }

    fn compress_in_blocks(compressor: &BlockCompressor, data: &[u8], block: usize) -> Vec<u8> {
        let mut stream = Vec::new();
        let mut start = 0;
        while start < data.len() || start == 0 {
            let end = (start + block).min(data.len());
            let dictionary = (start >= WINDOW_SIZE).then(|| &data[..start]);
            let last = end == data.len();
            stream.extend(
                compressor
                    .compress_block(&data[start..end], dictionary, last)
                    .unwrap(),
            );
            if last {
                break;
            }
            start = end;
        }
        stream
    }

    #[test]
    fn test_constants() {
        assert_eq!(WINDOW_SIZE, 32768);
        assert_eq!(PARALLEL_BLOCK_SIZE, 1 << 20);
        assert_eq!(MIN_PARALLEL_FILE_SIZE, 6 << 20);
    }

    #[test]
    fn test_single_block_roundtrip() {
        let data = sample(100_000);
        let compressor = BlockCompressor::new(5);
        let compressed = compressor.compress_all(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(inflate(&compressed), data);
    }

    #[test]
    fn test_empty_input() {
        let compressor = BlockCompressor::default();
        let compressed = compressor.compress_all(&[]).unwrap();
        assert!(!compressed.is_empty());
        assert!(inflate(&compressed).is_empty());
    }

    #[test]
    fn test_concatenated_blocks_form_one_stream() {
        let data = sample(3 * 100_000 + 123);
        let compressor = BlockCompressor::new(6);
        let stream = compress_in_blocks(&compressor, &data, 100_000);
        assert_eq!(inflate(&stream), data);
    }

    #[test]
    fn test_sync_flush_block_is_not_final() {
        let compressor = BlockCompressor::new(6);
        let fragment = compressor.compress_block(b"abcabcabc", None, false).unwrap();
        // Sync flush marker: empty stored block.
        assert!(fragment.ends_with(&[0x00, 0x00, 0xff, 0xff]));
    }

    #[test]
    fn test_dictionary_helps_repeated_content() {
        let chunk = sample(40_000);
        let compressor = BlockCompressor::new(6);
        let without = compressor.compress_block(&chunk, None, true).unwrap();
        let with = compressor.compress_block(&chunk, Some(&chunk), true).unwrap();
        assert!(with.len() < without.len());
    }

    #[test]
    fn test_level_zero_still_valid() {
        let data = sample(50_000);
        let compressor = BlockCompressor::new(0);
        let stream = compress_in_blocks(&compressor, &data, 20_000);
        assert_eq!(inflate(&stream), data);
    }
}
