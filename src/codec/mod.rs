//! Compression methods supported by the archive writer.
//!
//! Only the two methods every ZIP reader understands are produced:
//! [`CompressionMethod::Store`] and [`CompressionMethod::Deflate`]. The
//! [`deflate`] module implements block-wise raw DEFLATE with dictionary
//! carry-over so that large files can be compressed in parallel.

pub mod deflate;

pub use deflate::{
    BlockCompressor, MIN_PARALLEL_FILE_SIZE, PARALLEL_BLOCK_SIZE, WINDOW_SIZE,
};

/// ZIP method identifiers.
pub mod method {
    /// Stored (no compression).
    pub const STORE: u16 = 0;
    /// Raw DEFLATE.
    pub const DEFLATE: u16 = 8;
}

/// How an entry's content is encoded in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    /// Content is copied verbatim.
    Store,
    /// Content is raw DEFLATE.
    #[default]
    Deflate,
}

impl CompressionMethod {
    /// Returns the ZIP method identifier.
    pub fn id(self) -> u16 {
        match self {
            CompressionMethod::Store => method::STORE,
            CompressionMethod::Deflate => method::DEFLATE,
        }
    }

    /// Returns a human-readable name for this method.
    pub fn name(self) -> &'static str {
        match self {
            CompressionMethod::Store => "Store",
            CompressionMethod::Deflate => "Deflate",
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
