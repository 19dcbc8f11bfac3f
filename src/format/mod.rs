//! ZIP container format.
//!
//! This module contains the on-disk constants of the ZIP format and a
//! streaming [`ZipWriter`] that never seeks: entries whose compressed size is
//! not known up front carry a data descriptor after their data.
//!
//! # Layout
//!
//! ```text
//! [local header 1][data 1][data descriptor 1]
//! ...
//! [local header n][data n]
//! [central directory header 1] ... [central directory header n]
//! [zip64 end of central directory record]     (only when needed)
//! [zip64 end of central directory locator]    (only when needed)
//! [end of central directory record]
//! ```

mod header;
mod writer;

pub use header::{FileHeader, mode};
pub use writer::ZipWriter;

use std::io;

/// Local file header signature ("PK\x03\x04").
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Data descriptor signature ("PK\x07\x08").
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Central directory file header signature ("PK\x01\x02").
pub const CENTRAL_DIRECTORY_HEADER_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory signature ("PK\x05\x06").
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// Zip64 end of central directory record signature ("PK\x06\x06").
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0606_4b50;

/// Zip64 end of central directory locator signature ("PK\x06\x07").
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// Zip64 extended information extra field tag.
pub const ZIP64_EXTRA_TAG: u16 = 0x0001;

/// Sizes and offsets at or above this value need zip64 records.
pub const ZIP64_BYTES_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Entry counts at or above this value need zip64 records.
pub const ZIP64_ENTRY_THRESHOLD: usize = 0xFFFF;

/// Version needed to extract a plain Deflate/Store entry (2.0).
pub const VERSION_DEFAULT: u16 = 20;

/// Version needed to extract an entry with zip64 fields (4.5).
pub const VERSION_ZIP64: u16 = 45;

/// Host system written in the "version made by" field.
pub const HOST_UNIX: u16 = 3;

/// General purpose flag: sizes and CRC follow the data in a descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// General purpose flag: the entry name is UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;

/// MS-DOS directory attribute.
pub const MSDOS_DIRECTORY: u32 = 0x10;

/// Little-endian integer output for header fields.
pub(crate) trait WriteLe: io::Write {
    #[inline]
    fn write_u16_le(&mut self, value: u16) -> io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    #[inline]
    fn write_u32_le(&mut self, value: u32) -> io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    #[inline]
    fn write_u64_le(&mut self, value: u64) -> io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }
}

impl<W: io::Write + ?Sized> WriteLe for W {}

/// Clamps a 64-bit value to a 32-bit header field, saturating to the zip64 marker.
#[inline]
pub(crate) fn clamp_u32(value: u64) -> u32 {
    value.min(ZIP64_BYTES_THRESHOLD) as u32
}
