//! Parallel archive creation.
//!
//! Building an archive runs three kinds of participants:
//!
//! - a producer thread that walks the mappings in order, queues one pending
//!   entry per archive member and hands compression work to a worker pool,
//!   bounded by a CPU limiter and a memory limiter;
//! - worker tasks that read, checksum and compress content, either as a
//!   whole or as 1 MiB blocks for large files;
//! - the sequencer on the calling thread, the only code that writes to the
//!   archive, draining entries and their blocks strictly in order.
//!
//! # Example
//!
//! ```rust,no_run
//! use parzip::{CompressionMethod, PathMapping, ZipOptions, Zipper};
//!
//! let mappings = vec![
//!     PathMapping::new("a.txt", "in/a.txt", CompressionMethod::Deflate),
//!     PathMapping::new("b/", "in/b", CompressionMethod::Store),
//! ];
//! let zipper = Zipper::new(ZipOptions::new().directories(true));
//! let bytes = zipper.write_to(mappings, Vec::new())?;
//! assert_eq!(&bytes[..2], b"PK");
//! # Ok::<(), parzip::Error>(())
//! ```

mod entry;
pub(crate) mod options;
mod pipeline;
mod scheduler;
mod sequencer;

pub use options::{DEFAULT_LEVEL, ZipArgs, ZipOptions};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread;

use crate::codec::CompressionMethod;
use crate::format::ZipWriter;
use crate::jar;
use crate::mapping::{PathMapping, resolve};
use crate::{Error, Result};
use pipeline::Pipeline;
use scheduler::EntryScheduler;

/// Pending entries the producer may run ahead of the sequencer.
const ENTRY_QUEUE_DEPTH: usize = 1000;

/// Writes archives from resolved mappings.
#[derive(Debug, Clone, Default)]
pub struct Zipper {
    options: ZipOptions,
}

impl Zipper {
    /// Creates a zipper with the given options.
    pub fn new(options: ZipOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    pub fn options(&self) -> &ZipOptions {
        &self.options
    }

    /// Rejects option combinations that cannot produce an archive.
    pub fn validate(&self) -> Result<()> {
        if self.options.level > 9 {
            return Err(Error::InvalidCompressionLevel {
                level: self.options.level,
            });
        }
        if self.options.manifest.is_some() && !self.options.emulate_jar {
            return Err(Error::ManifestWithoutJar);
        }
        Ok(())
    }

    /// Writes an archive of `mappings` to `writer` and returns the writer.
    ///
    /// Entries appear in mapping order, or in jar order when jar emulation
    /// is on. The first error stops the build; `writer` then holds a
    /// partial archive and is dropped.
    pub fn write_to<W: Write>(&self, mut mappings: Vec<PathMapping>, writer: W) -> Result<W> {
        self.validate()?;

        if self.options.emulate_jar {
            let manifest = self.options.manifest.clone().unwrap_or_default();
            mappings.push(PathMapping::new(
                jar::MANIFEST_FILE,
                manifest,
                CompressionMethod::Store,
            ));
            jar::sort_mappings(&mut mappings);
        }

        let pipeline = Arc::new(Pipeline::new(&self.options));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pipeline.cpu.jobs())
            .thread_name(|i| format!("parzip-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        log::debug!(
            "writing {} mappings with {} jobs and a {} byte memory budget",
            mappings.len(),
            pipeline.cpu.jobs(),
            pipeline.memory.limit()
        );

        let (queue_tx, queue_rx) = mpsc::sync_channel(ENTRY_QUEUE_DEPTH);
        let mut zip = ZipWriter::new(writer);

        thread::scope(|scope| {
            let producer = Arc::clone(&pipeline);
            let options = &self.options;
            let pool = &pool;
            scope.spawn(move || {
                let mut scheduler =
                    EntryScheduler::new(options, Arc::clone(&producer), pool, queue_tx);
                if let Err(err) = scheduler.schedule_all(&mappings) {
                    producer.fail(err);
                }
                // Dropping the scheduler closes the queue.
            });

            let result = sequencer::write_entries(&mut zip, queue_rx, &pipeline);
            if result.is_err() {
                pipeline.abort();
            }
            result
        })?;

        log::debug!("wrote {} entries", zip.len());
        zip.finish()
    }
}

/// Resolves `args` and writes the archive to `args.output`.
///
/// In direct mode the output is streamed to disk and removed if anything
/// fails. With [`ZipOptions::write_if_changed`] the archive is built in
/// memory and the output is only replaced when its bytes differ.
pub fn zip(args: &ZipArgs) -> Result<()> {
    if args.output.as_os_str().is_empty() {
        return Err(Error::MissingOutputPath);
    }
    let zipper = Zipper::new(args.options.clone());
    zipper.validate()?;
    let mappings = resolve(&args.file_args, &args.resolve_options()?)?;

    if args.options.write_if_changed {
        let bytes = zipper.write_to(mappings, Vec::new())?;
        return write_if_changed(&args.output, &bytes);
    }

    let file = File::create(&args.output)?;
    let result = zipper
        .write_to(mappings, BufWriter::new(file))
        .and_then(|mut writer| writer.flush().map_err(Error::from));
    if let Err(err) = result {
        if let Err(remove_err) = fs::remove_file(&args.output) {
            log::warn!(
                "failed to remove {}: {remove_err}",
                args.output.display()
            );
        }
        return Err(err);
    }
    Ok(())
}

/// Resolves `args` and writes the archive to `writer`, ignoring the output
/// path and output mode.
pub fn zip_to<W: Write>(args: &ZipArgs, writer: W) -> Result<W> {
    let zipper = Zipper::new(args.options.clone());
    zipper.validate()?;
    let mappings = resolve(&args.file_args, &args.resolve_options()?)?;
    zipper.write_to(mappings, writer)
}

fn write_if_changed(path: &Path, bytes: &[u8]) -> Result<()> {
    match fs::read(path) {
        Ok(existing) if existing == bytes => {
            log::debug!("{} is unchanged", path.display());
            return Ok(());
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    fs::write(path, bytes)?;
    Ok(())
}
