//! Streaming ZIP writer.

use std::collections::HashSet;
use std::io::{self, Write};

use super::header::FileHeader;
use super::{
    CENTRAL_DIRECTORY_HEADER_SIGNATURE, DATA_DESCRIPTOR_SIGNATURE,
    END_OF_CENTRAL_DIRECTORY_SIGNATURE, FLAG_DATA_DESCRIPTOR, FLAG_UTF8, HOST_UNIX,
    LOCAL_FILE_HEADER_SIGNATURE, VERSION_DEFAULT, VERSION_ZIP64, WriteLe, ZIP64_BYTES_THRESHOLD,
    ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIGNATURE, ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    ZIP64_ENTRY_THRESHOLD, ZIP64_EXTRA_TAG, clamp_u32,
};
use crate::{Error, Result};

/// Fraction of the uncompressed size reserved for DEFLATE expansion.
const STREAMED_EXPANSION_DIVISOR: u64 = 1024;

/// Fixed expansion allowance on top of the proportional one.
const STREAMED_EXPANSION_SLACK: u64 = 64 * 1024;

/// Counts bytes written to the inner writer; the count is the current archive offset.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// An entry that has been written, kept for the central directory.
#[derive(Debug)]
struct CentralRecord {
    header: FileHeader,
    offset: u64,
    flags: u16,
}

/// The entry whose data is currently being written.
#[derive(Debug)]
struct OpenEntry {
    record: usize,
    streamed: bool,
    large: bool,
    written: u64,
}

/// Writes a ZIP archive to any [`Write`] sink without seeking.
///
/// Entries are written one at a time: create a header, write its data,
/// close it. Entries created with [`create_header`](Self::create_header)
/// must declare final sizes and CRC up front; entries created with
/// [`create_compressed_header`](Self::create_compressed_header) receive
/// pre-compressed data and get a data descriptor when closed.
///
/// # Example
///
/// ```rust
/// use parzip::codec::CompressionMethod;
/// use parzip::format::{FileHeader, ZipWriter};
///
/// let mut zip = ZipWriter::new(Vec::new());
///
/// let mut header = FileHeader::file("hello.txt", CompressionMethod::Store, 5, false);
/// header.crc32 = parzip::checksum::Crc32::compute(b"hello");
/// header.compressed_size = 5;
/// zip.create_header(header)?;
/// zip.write_data(b"hello")?;
/// zip.close_entry()?;
///
/// let bytes = zip.finish()?;
/// assert_eq!(&bytes[..4], b"PK\x03\x04");
/// # Ok::<(), parzip::Error>(())
/// ```
pub struct ZipWriter<W: Write> {
    inner: CountingWriter<W>,
    records: Vec<CentralRecord>,
    names: HashSet<String>,
    current: Option<OpenEntry>,
    comment: Vec<u8>,
}

impl<W: Write> std::fmt::Debug for ZipWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipWriter")
            .field("offset", &self.inner.count)
            .field("entries", &self.records.len())
            .field("open", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

impl<W: Write> ZipWriter<W> {
    /// Starts an archive at offset zero of `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            inner: CountingWriter {
                inner: writer,
                count: 0,
            },
            records: Vec::new(),
            names: HashSet::new(),
            current: None,
            comment: Vec::new(),
        }
    }

    /// Sets the archive comment written in the end record.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) {
        self.comment = comment.into();
    }

    /// Number of bytes written so far.
    pub fn offset(&self) -> u64 {
        self.inner.count
    }

    /// Number of entries created so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no entry has been created.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Starts an entry whose sizes and CRC are final.
    ///
    /// Exactly `header.compressed_size` bytes must follow.
    pub fn create_header(&mut self, header: FileHeader) -> Result<()> {
        self.begin(header, false)
    }

    /// Starts an entry whose compressed data is written as-is and whose
    /// compressed size is determined when the entry is closed.
    ///
    /// `header.crc32` and `header.uncompressed_size` must be final.
    pub fn create_compressed_header(&mut self, header: FileHeader) -> Result<()> {
        self.begin(header, true)
    }

    /// Appends data to the open entry.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let entry = self.current.as_mut().ok_or(Error::NoOpenEntry)?;
        self.inner.write_all(data)?;
        entry.written += data.len() as u64;
        Ok(())
    }

    /// Finishes the open entry.
    pub fn close_entry(&mut self) -> Result<()> {
        let entry = self.current.take().ok_or(Error::NoOpenEntry)?;
        let record = &mut self.records[entry.record];

        if !entry.streamed {
            if entry.written != record.header.compressed_size {
                return Err(Error::EntrySizeMismatch {
                    name: record.header.name.clone(),
                    expected: record.header.compressed_size,
                    actual: entry.written,
                });
            }
            return Ok(());
        }

        record.header.compressed_size = entry.written;
        let header = &record.header;
        // The descriptor width must match the local header's zip64 field.
        if !entry.large && header.needs_zip64() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: entry grew past the size declared in its header", header.name),
            )
            .into());
        }
        let w = &mut self.inner;
        w.write_u32_le(DATA_DESCRIPTOR_SIGNATURE)?;
        w.write_u32_le(header.crc32)?;
        if entry.large {
            w.write_u64_le(header.compressed_size)?;
            w.write_u64_le(header.uncompressed_size)?;
        } else {
            w.write_u32_le(header.compressed_size as u32)?;
            w.write_u32_le(header.uncompressed_size as u32)?;
        }
        Ok(())
    }

    /// Writes the central directory and end records and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        if let Some(entry) = &self.current {
            return Err(Error::EntryInProgress {
                name: "central directory".into(),
                open: self.records[entry.record].header.name.clone(),
            });
        }

        let central_start = self.inner.count;
        for record in &self.records {
            write_central_directory_header(&mut self.inner, record)?;
        }
        let central_size = self.inner.count - central_start;

        let entries = self.records.len();
        if entries >= ZIP64_ENTRY_THRESHOLD
            || central_size >= ZIP64_BYTES_THRESHOLD
            || central_start >= ZIP64_BYTES_THRESHOLD
        {
            let record_offset = self.inner.count;
            let w = &mut self.inner;
            w.write_u32_le(ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE)?;
            // size of the remaining record
            w.write_u64_le(44)?;
            w.write_u16_le((HOST_UNIX << 8) | VERSION_ZIP64)?;
            w.write_u16_le(VERSION_ZIP64)?;
            w.write_u32_le(0)?;
            w.write_u32_le(0)?;
            w.write_u64_le(entries as u64)?;
            w.write_u64_le(entries as u64)?;
            w.write_u64_le(central_size)?;
            w.write_u64_le(central_start)?;

            w.write_u32_le(ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIGNATURE)?;
            w.write_u32_le(0)?;
            w.write_u64_le(record_offset)?;
            w.write_u32_le(1)?;
        }

        let count = entries.min(ZIP64_ENTRY_THRESHOLD) as u16;
        let comment_len = u16::try_from(self.comment.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "archive comment too long")
        })?;
        let w = &mut self.inner;
        w.write_u32_le(END_OF_CENTRAL_DIRECTORY_SIGNATURE)?;
        w.write_u16_le(0)?;
        w.write_u16_le(0)?;
        w.write_u16_le(count)?;
        w.write_u16_le(count)?;
        w.write_u32_le(clamp_u32(central_size))?;
        w.write_u32_le(clamp_u32(central_start))?;
        w.write_u16_le(comment_len)?;
        w.write_all(&self.comment)?;
        w.flush()?;

        Ok(self.inner.inner)
    }

    fn begin(&mut self, header: FileHeader, streamed: bool) -> Result<()> {
        if let Some(entry) = &self.current {
            return Err(Error::EntryInProgress {
                name: header.name,
                open: self.records[entry.record].header.name.clone(),
            });
        }
        if self.names.contains(&header.name) {
            return Err(Error::DuplicateEntry { name: header.name });
        }
        if header.name.len() > usize::from(u16::MAX) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "entry name too long").into());
        }

        let mut flags = 0;
        if streamed {
            flags |= FLAG_DATA_DESCRIPTOR;
        }
        if !header.name.is_ascii() {
            flags |= FLAG_UTF8;
        }
        let large = if streamed {
            streamed_needs_zip64(&header)
        } else {
            header.needs_zip64()
        };
        let offset = self.inner.count;

        write_local_file_header(&mut self.inner, &header, flags, streamed, large)?;

        self.names.insert(header.name.clone());
        self.records.push(CentralRecord {
            header,
            offset,
            flags,
        });
        self.current = Some(OpenEntry {
            record: self.records.len() - 1,
            streamed,
            large,
            written: 0,
        });
        Ok(())
    }
}

/// Whether a streamed entry gets a local zip64 field.
///
/// The compressed size is unknown when the local header is written, so the
/// decision is made from the uncompressed size plus room for worst-case
/// DEFLATE expansion (stored blocks and per-block sync flushes).
fn streamed_needs_zip64(header: &FileHeader) -> bool {
    let size = header.uncompressed_size;
    let slack = size / STREAMED_EXPANSION_DIVISOR + STREAMED_EXPANSION_SLACK;
    header.needs_zip64() || size.saturating_add(slack) >= ZIP64_BYTES_THRESHOLD
}

fn write_local_file_header<W: Write>(
    w: &mut W,
    header: &FileHeader,
    flags: u16,
    streamed: bool,
    large: bool,
) -> io::Result<()> {
    let extra_len = header.extra.len() + if large { 20 } else { 0 };
    let extra_len = u16::try_from(extra_len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "extra field too long"))?;

    w.write_u32_le(LOCAL_FILE_HEADER_SIGNATURE)?;
    w.write_u16_le(if large { VERSION_ZIP64 } else { VERSION_DEFAULT })?;
    w.write_u16_le(flags)?;
    w.write_u16_le(header.method.id())?;
    w.write_u16_le(header.modified.timepart())?;
    w.write_u16_le(header.modified.datepart())?;
    if streamed {
        // crc and sizes follow the data
        w.write_u32_le(0)?;
        w.write_u32_le(0)?;
        w.write_u32_le(0)?;
    } else if large {
        w.write_u32_le(header.crc32)?;
        w.write_u32_le(u32::MAX)?;
        w.write_u32_le(u32::MAX)?;
    } else {
        w.write_u32_le(header.crc32)?;
        w.write_u32_le(header.compressed_size as u32)?;
        w.write_u32_le(header.uncompressed_size as u32)?;
    }
    w.write_u16_le(header.name.len() as u16)?;
    w.write_u16_le(extra_len)?;
    w.write_all(header.name.as_bytes())?;
    if large {
        // The local zip64 field carries both sizes; zero when a descriptor follows.
        w.write_u16_le(ZIP64_EXTRA_TAG)?;
        w.write_u16_le(16)?;
        let (uncompressed, compressed) = if streamed {
            (0, 0)
        } else {
            (header.uncompressed_size, header.compressed_size)
        };
        w.write_u64_le(uncompressed)?;
        w.write_u64_le(compressed)?;
    }
    w.write_all(&header.extra)?;
    Ok(())
}

/// Builds the central zip64 extra field; only oversized values are included.
fn central_zip64_extra(header: &FileHeader, offset: u64) -> Vec<u8> {
    let mut fields = Vec::with_capacity(24);
    for value in [header.uncompressed_size, header.compressed_size, offset] {
        if value >= ZIP64_BYTES_THRESHOLD {
            fields.extend_from_slice(&value.to_le_bytes());
        }
    }
    if fields.is_empty() {
        return fields;
    }
    let mut extra = Vec::with_capacity(4 + fields.len());
    extra.extend_from_slice(&ZIP64_EXTRA_TAG.to_le_bytes());
    extra.extend_from_slice(&(fields.len() as u16).to_le_bytes());
    extra.extend_from_slice(&fields);
    extra
}

fn write_central_directory_header<W: Write>(w: &mut W, record: &CentralRecord) -> io::Result<()> {
    let header = &record.header;
    let zip64_extra = central_zip64_extra(header, record.offset);
    let version_needed = if zip64_extra.is_empty() {
        VERSION_DEFAULT
    } else {
        VERSION_ZIP64
    };
    let extra_len = u16::try_from(zip64_extra.len() + header.extra.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "extra field too long"))?;

    w.write_u32_le(CENTRAL_DIRECTORY_HEADER_SIGNATURE)?;
    w.write_u16_le((HOST_UNIX << 8) | version_needed)?;
    w.write_u16_le(version_needed)?;
    w.write_u16_le(record.flags)?;
    w.write_u16_le(header.method.id())?;
    w.write_u16_le(header.modified.timepart())?;
    w.write_u16_le(header.modified.datepart())?;
    w.write_u32_le(header.crc32)?;
    w.write_u32_le(clamp_u32(header.compressed_size))?;
    w.write_u32_le(clamp_u32(header.uncompressed_size))?;
    w.write_u16_le(header.name.len() as u16)?;
    w.write_u16_le(extra_len)?;
    // comment length, disk number start, internal attributes
    w.write_u16_le(0)?;
    w.write_u16_le(0)?;
    w.write_u16_le(0)?;
    w.write_u32_le(header.external_attributes)?;
    w.write_u32_le(clamp_u32(record.offset))?;
    w.write_all(header.name.as_bytes())?;
    w.write_all(&zip64_extra)?;
    w.write_all(&header.extra)?;
    Ok(())
}
