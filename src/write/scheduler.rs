//! Producer side of the pipeline.
//!
//! [`EntryScheduler`] walks the mappings in order on a single thread. For
//! each one it queues a [`PendingEntry`], then acquires the CPU slot and the
//! memory the entry needs and hands the work to the worker pool. Directory
//! and destination bookkeeping happens here and nowhere else.

use std::collections::HashMap;
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender, SyncSender};

use rayon::ThreadPool;

use super::entry::{BlockFuture, PendingEntry, ReadyEntry, completed_blocks};
use super::options::ZipOptions;
use super::pipeline::Pipeline;
use crate::archive_path;
use crate::checksum::Crc32;
use crate::codec::{
    BlockCompressor, CompressionMethod, MIN_PARALLEL_FILE_SIZE, PARALLEL_BLOCK_SIZE, WINDOW_SIZE,
};
use crate::format::FileHeader;
use crate::jar;
use crate::mapping::PathMapping;
use crate::rate_limit::Reservation;
use crate::{Error, Result};

/// Where the content of a file entry comes from.
enum EntrySource {
    File { file: File, path: PathBuf },
    Bytes(Vec<u8>),
}

pub(crate) struct EntryScheduler<'a> {
    options: &'a ZipOptions,
    pipeline: Arc<Pipeline>,
    pool: &'a ThreadPool,
    queue: SyncSender<PendingEntry>,
    created_dirs: HashMap<String, PathBuf>,
    created_files: HashMap<String, PathBuf>,
}

impl<'a> EntryScheduler<'a> {
    pub(crate) fn new(
        options: &'a ZipOptions,
        pipeline: Arc<Pipeline>,
        pool: &'a ThreadPool,
        queue: SyncSender<PendingEntry>,
    ) -> Self {
        Self {
            options,
            pipeline,
            pool,
            queue,
            created_dirs: HashMap::new(),
            created_files: HashMap::new(),
        }
    }

    /// Schedules every mapping in order.
    pub(crate) fn schedule_all(&mut self, mappings: &[PathMapping]) -> Result<()> {
        for mapping in mappings {
            if self.pipeline.is_aborted() {
                return Err(Error::Cancelled);
            }
            if self.options.emulate_jar && mapping.dest == jar::MANIFEST_FILE {
                self.add_manifest(mapping)?;
            } else {
                self.add_file(mapping)?;
            }
        }
        Ok(())
    }

    fn add_file(&mut self, mapping: &PathMapping) -> Result<()> {
        let dest = mapping.dest.as_str();
        let src = mapping.src.as_path();

        let stat = if self.options.store_symlinks {
            fs::symlink_metadata(src)
        } else {
            fs::metadata(src)
        };
        let metadata = match stat {
            Ok(metadata) => metadata,
            Err(err)
                if err.kind() == io::ErrorKind::NotFound && self.options.ignore_missing_files =>
            {
                log::warn!("ignoring missing source {}", src.display());
                return Ok(());
            }
            Err(err) => return Err(with_path(err, src).into()),
        };

        if metadata.is_dir() {
            if self.options.directories_enabled() {
                return self.write_directory(dest, src);
            }
            return Ok(());
        }

        self.write_directory(archive_path::parent(dest).unwrap_or(""), src)?;

        if let Some(previous) = self.created_dirs.get(dest) {
            return Err(Error::DirectoryFileConflict {
                dest: dest.to_string(),
                dir_source: previous.clone(),
                file_source: src.to_path_buf(),
            });
        }
        if let Some(previous) = self.created_files.get(dest) {
            if previous == src {
                log::debug!("skipping repeated mapping {dest} <- {}", src.display());
                return Ok(());
            }
            return Err(Error::ConflictingFile {
                dest: dest.to_string(),
                previous: previous.clone(),
                current: src.to_path_buf(),
            });
        }
        self.created_files.insert(dest.to_string(), src.to_path_buf());

        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            return self.write_symlink(dest, src);
        }
        if !file_type.is_file() {
            return Err(Error::UnsupportedFileType {
                path: src.to_path_buf(),
            });
        }

        let header = FileHeader::file(
            dest,
            mapping.method,
            metadata.len(),
            is_executable(&metadata),
        )
        .with_modified(self.options.modified);
        let file = File::open(src).map_err(|e| with_path(e, src))?;
        self.write_file_contents(
            header,
            EntrySource::File {
                file,
                path: src.to_path_buf(),
            },
        )
    }

    fn add_manifest(&mut self, mapping: &PathMapping) -> Result<()> {
        let dest = mapping.dest.as_str();
        let src = mapping.src.as_path();

        if let Some(previous) = self.created_dirs.get(dest) {
            return Err(Error::DirectoryFileConflict {
                dest: dest.to_string(),
                dir_source: previous.clone(),
                file_source: src.to_path_buf(),
            });
        }
        if let Some(previous) = self.created_files.get(dest) {
            return Err(Error::ConflictingFile {
                dest: dest.to_string(),
                previous: previous.clone(),
                current: src.to_path_buf(),
            });
        }
        self.created_files.insert(dest.to_string(), src.to_path_buf());
        self.write_directory(archive_path::parent(dest).unwrap_or(""), src)?;

        let contents = if src.as_os_str().is_empty() {
            Vec::new()
        } else {
            fs::read(src).map_err(|e| with_path(e, src))?
        };
        let contents = jar::manifest_contents(&contents);
        let header = jar::manifest_header(&contents, self.options.modified);
        self.write_file_contents(header, EntrySource::Bytes(contents))
    }

    /// Records `dir` and its missing ancestors, emitting them top-down when
    /// directory entries are enabled.
    fn write_directory(&mut self, dir: &str, src: &Path) -> Result<()> {
        let mut dir = dir.trim_end_matches('/');
        let mut new_dirs = Vec::new();
        while !dir.is_empty() && dir != "." {
            if self.created_dirs.contains_key(dir) {
                break;
            }
            if let Some(previous) = self.created_files.get(dir) {
                return Err(Error::DirectoryFileConflict {
                    dest: dir.to_string(),
                    dir_source: src.to_path_buf(),
                    file_source: previous.clone(),
                });
            }
            self.created_dirs.insert(dir.to_string(), src.to_path_buf());
            new_dirs.push(dir);
            dir = archive_path::parent(dir).unwrap_or("");
        }

        if !self.options.directories_enabled() {
            return Ok(());
        }
        for dir in new_dirs.into_iter().rev() {
            let header = if self.options.emulate_jar && dir == jar::META_DIR.trim_end_matches('/') {
                jar::meta_dir_header(self.options.modified)
            } else {
                FileHeader::directory(dir).with_modified(self.options.modified)
            };
            self.enqueue(PendingEntry::resolved(header, None))?;
        }
        Ok(())
    }

    fn write_symlink(&mut self, dest: &str, src: &Path) -> Result<()> {
        let target = fs::read_link(src).map_err(|e| with_path(e, src))?;
        let target = link_target_bytes(&target);
        let header = FileHeader::symlink(dest, &target).with_modified(self.options.modified);
        self.enqueue(PendingEntry::resolved(header, Some(target)))
    }

    fn write_file_contents(&mut self, header: FileHeader, source: EntrySource) -> Result<()> {
        let (pending, ready) = PendingEntry::new(header.name.clone());
        self.enqueue(pending)?;

        let cpu = self.pipeline.cpu.acquire()?;
        let memory = self.pipeline.memory.acquire(header.uncompressed_size)?;

        match source {
            EntrySource::File { file, path }
                if header.method == CompressionMethod::Deflate
                    && header.uncompressed_size >= MIN_PARALLEL_FILE_SIZE =>
            {
                log::debug!(
                    "compressing {} ({} bytes) in parallel blocks",
                    header.name,
                    header.uncompressed_size
                );
                self.compress_parallel(header, file, path, cpu, memory, ready)
            }
            source => {
                let pipeline = Arc::clone(&self.pipeline);
                self.pool.spawn(move || {
                    let _cpu = cpu;
                    if pipeline.is_aborted() {
                        return;
                    }
                    match compress_whole(&pipeline.compressor, header, source) {
                        Ok((header, data)) => {
                            let _ = ready.send(ReadyEntry {
                                header,
                                blocks: completed_blocks(Some(data)),
                                memory: Some(memory),
                            });
                        }
                        Err(err) => pipeline.fail(err),
                    }
                });
                Ok(())
            }
        }
    }

    /// Splits a large file into blocks compressed concurrently while a
    /// separate task computes the CRC of the whole file.
    fn compress_parallel(
        &mut self,
        header: FileHeader,
        file: File,
        path: PathBuf,
        cpu: Reservation,
        memory: Reservation,
        ready: Sender<ReadyEntry>,
    ) -> Result<()> {
        let size = header.uncompressed_size;
        let (blocks_tx, blocks_rx) = mpsc::channel();

        let pipeline = Arc::clone(&self.pipeline);
        let crc_path = path.clone();
        self.pool.spawn(move || {
            let _cpu = cpu;
            if pipeline.is_aborted() {
                return;
            }
            let mut header = header;
            match crc_file(&header.name, &crc_path, size) {
                Ok(crc) => {
                    header.crc32 = crc;
                    let _ = ready.send(ReadyEntry {
                        header,
                        blocks: blocks_rx,
                        memory: Some(memory),
                    });
                }
                Err(err) => pipeline.fail(err),
            }
        });

        if let Err(err) = self.schedule_blocks(file, &path, size, &blocks_tx) {
            // Record before `blocks_tx` drops so the sequencer never sees a
            // short block sequence as complete.
            self.pipeline.fail(err);
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn schedule_blocks(
        &self,
        mut file: File,
        path: &Path,
        size: u64,
        blocks: &Sender<BlockFuture>,
    ) -> Result<()> {
        let mut previous: Option<Arc<Vec<u8>>> = None;
        let mut start = 0u64;

        while start < size {
            let len = (size - start).min(PARALLEL_BLOCK_SIZE as u64) as usize;
            let mut data = vec![0; len];
            file.read_exact(&mut data).map_err(|e| with_path(e, path))?;
            let data = Arc::new(data);
            let last = start + len as u64 == size;

            let (result_tx, result_rx) = mpsc::channel();
            blocks.send(result_rx).map_err(|_| Error::Cancelled)?;

            let cpu = self.pipeline.cpu.acquire()?;
            let dictionary = if start >= WINDOW_SIZE as u64 {
                previous.clone()
            } else {
                None
            };
            let block = Arc::clone(&data);
            let pipeline = Arc::clone(&self.pipeline);
            self.pool.spawn(move || {
                let _cpu = cpu;
                if pipeline.is_aborted() {
                    return;
                }
                let dictionary = dictionary.as_deref().map(Vec::as_slice);
                match pipeline.compressor.compress_block(&block, dictionary, last) {
                    Ok(compressed) => {
                        let _ = result_tx.send(compressed);
                    }
                    Err(err) => pipeline.fail(err.into()),
                }
            });

            previous = Some(data);
            start += len as u64;
        }
        Ok(())
    }

    fn enqueue(&self, entry: PendingEntry) -> Result<()> {
        self.queue.send(entry).map_err(|_| Error::Cancelled)
    }
}

/// Reads, checksums and compresses a whole entry, falling back to Store
/// when compression does not shrink it.
fn compress_whole(
    compressor: &BlockCompressor,
    mut header: FileHeader,
    source: EntrySource,
) -> Result<(FileHeader, Vec<u8>)> {
    let expected = header.uncompressed_size;
    let content = match source {
        EntrySource::Bytes(bytes) => bytes,
        EntrySource::File { file, path } => {
            let mut content = Vec::with_capacity(expected as usize);
            file.take(expected.saturating_add(1))
                .read_to_end(&mut content)
                .map_err(|e| with_path(e, &path))?;
            content
        }
    };
    if content.len() as u64 != expected {
        return Err(Error::EntrySizeMismatch {
            name: header.name,
            expected,
            actual: content.len() as u64,
        });
    }

    header.crc32 = Crc32::compute(&content);
    if header.method == CompressionMethod::Deflate {
        let compressed = compressor.compress_all(&content)?;
        if (compressed.len() as u64) < expected {
            header.compressed_size = compressed.len() as u64;
            return Ok((header, compressed));
        }
        log::debug!("storing {}: deflate did not shrink it", header.name);
        header.method = CompressionMethod::Store;
    }
    header.compressed_size = expected;
    Ok((header, content))
}

fn crc_file(name: &str, path: &Path, size: u64) -> Result<u32> {
    let file = File::open(path).map_err(|e| with_path(e, path))?;
    let (crc, len) = Crc32::compute_reader(&mut file.take(size.saturating_add(1)))
        .map_err(|e| with_path(e, path))?;
    if len != size {
        return Err(Error::EntrySizeMismatch {
            name: name.to_string(),
            expected: size,
            actual: len,
        });
    }
    Ok(crc)
}

fn with_path(err: io::Error, path: &Path) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {err}", path.display()))
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}

#[cfg(unix)]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    archive_path::from_fs_path(target).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_whole_deflates_text() {
        let content = b"abcabcabc".repeat(100);
        let header = FileHeader::file("a.txt", CompressionMethod::Deflate, content.len() as u64, false);
        let (header, data) = compress_whole(
            &BlockCompressor::default(),
            header,
            EntrySource::Bytes(content.clone()),
        )
        .unwrap();
        assert_eq!(header.method, CompressionMethod::Deflate);
        assert_eq!(header.compressed_size, data.len() as u64);
        assert_eq!(header.crc32, Crc32::compute(&content));
        assert!(data.len() < content.len());
    }

    #[test]
    fn test_compress_whole_empty_falls_back_to_store() {
        let header = FileHeader::file("empty", CompressionMethod::Deflate, 0, false);
        let (header, data) =
            compress_whole(&BlockCompressor::default(), header, EntrySource::Bytes(Vec::new()))
                .unwrap();
        assert_eq!(header.method, CompressionMethod::Store);
        assert_eq!(header.compressed_size, 0);
        assert!(data.is_empty());
    }

    #[test]
    fn test_compress_whole_size_mismatch() {
        let header = FileHeader::file("a", CompressionMethod::Store, 10, false);
        let err = compress_whole(
            &BlockCompressor::default(),
            header,
            EntrySource::Bytes(b"short".to_vec()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::EntrySizeMismatch {
                expected: 10,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_crc_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        fs::write(temp.path(), b"hello").unwrap();
        assert_eq!(
            crc_file("a", temp.path(), 5).unwrap(),
            Crc32::compute(b"hello")
        );
        assert!(matches!(
            crc_file("a", temp.path(), 4),
            Err(Error::EntrySizeMismatch { .. })
        ));
    }
}
