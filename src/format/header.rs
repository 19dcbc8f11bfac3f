//! Per-entry header metadata.

use crate::codec::CompressionMethod;
use crate::timestamp::DosDateTime;

use super::{MSDOS_DIRECTORY, ZIP64_BYTES_THRESHOLD};

/// Unix file mode bits stored in the upper half of the external attributes.
pub mod mode {
    /// File type mask.
    pub const S_IFMT: u32 = 0o170000;
    /// Regular file.
    pub const S_IFREG: u32 = 0o100000;
    /// Directory.
    pub const S_IFDIR: u32 = 0o040000;
    /// Symbolic link.
    pub const S_IFLNK: u32 = 0o120000;

    /// Regular file, `rw-r--r--`.
    pub const FILE: u32 = S_IFREG | 0o644;
    /// Regular file, `rwxr-xr-x`.
    pub const EXECUTABLE: u32 = S_IFREG | 0o755;
    /// Directory, `rwxr-xr-x`.
    pub const DIRECTORY: u32 = S_IFDIR | 0o755;
    /// Symbolic link, `rwxrwxrwx`.
    pub const SYMLINK: u32 = S_IFLNK | 0o777;
}

/// Metadata of one archive entry.
///
/// Sizes and the CRC are provisional until the entry's content has been
/// compressed; the sequencer hands a complete header to the [`ZipWriter`].
///
/// [`ZipWriter`]: super::ZipWriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Entry name; directories end with `/`.
    pub name: String,
    /// Compression method.
    pub method: CompressionMethod,
    /// Modification time.
    pub modified: DosDateTime,
    /// CRC-32 of the uncompressed content.
    pub crc32: u32,
    /// Size of the data as stored in the archive.
    pub compressed_size: u64,
    /// Size of the original content.
    pub uncompressed_size: u64,
    /// External attributes (Unix mode in the upper 16 bits).
    pub external_attributes: u32,
    /// Extra field bytes, written to both local and central headers.
    pub extra: Vec<u8>,
}

impl FileHeader {
    /// Creates an empty header.
    pub fn new(name: impl Into<String>, method: CompressionMethod) -> Self {
        Self {
            name: name.into(),
            method,
            modified: DosDateTime::DEFAULT,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            external_attributes: 0,
            extra: Vec::new(),
        }
    }

    /// Creates a regular file header with the given uncompressed size.
    pub fn file(
        name: impl Into<String>,
        method: CompressionMethod,
        size: u64,
        executable: bool,
    ) -> Self {
        let mut header = Self::new(name, method);
        header.uncompressed_size = size;
        header.set_mode(if executable {
            mode::EXECUTABLE
        } else {
            mode::FILE
        });
        header
    }

    /// Creates a directory header; `/` is appended to the name.
    pub fn directory(name: &str) -> Self {
        let name = format!("{}/", name.trim_end_matches('/'));
        let mut header = Self::new(name, CompressionMethod::Store);
        header.set_mode(mode::DIRECTORY);
        header
    }

    /// Creates a symlink header whose content is `target`.
    pub fn symlink(name: impl Into<String>, target: &[u8]) -> Self {
        let mut header = Self::new(name, CompressionMethod::Store);
        header.set_mode(mode::SYMLINK);
        header.crc32 = crate::checksum::Crc32::compute(target);
        header.uncompressed_size = target.len() as u64;
        header.compressed_size = target.len() as u64;
        header
    }

    /// Sets the modification time.
    pub fn with_modified(mut self, modified: DosDateTime) -> Self {
        self.modified = modified;
        self
    }

    /// Stores a Unix mode, including file type bits.
    pub fn set_mode(&mut self, unix_mode: u32) {
        self.external_attributes = unix_mode << 16;
        if unix_mode & mode::S_IFMT == mode::S_IFDIR {
            self.external_attributes |= MSDOS_DIRECTORY;
        }
    }

    /// Returns the Unix mode, including file type bits.
    pub fn mode(&self) -> u32 {
        self.external_attributes >> 16
    }

    /// Returns true for directory entries.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Returns true for symlink entries.
    pub fn is_symlink(&self) -> bool {
        self.mode() & mode::S_IFMT == mode::S_IFLNK
    }

    /// Returns true if either size needs zip64 fields.
    pub fn needs_zip64(&self) -> bool {
        self.uncompressed_size >= ZIP64_BYTES_THRESHOLD
            || self.compressed_size >= ZIP64_BYTES_THRESHOLD
    }
}
