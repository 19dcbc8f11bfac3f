//! # parzip
//!
//! A parallel, rate-limited, deterministic ZIP archive writer.
//!
//! `parzip` turns an ordered list of `destination <- source` mappings into a
//! single ZIP stream. Files are read and compressed concurrently, large files
//! in 1 MiB blocks with DEFLATE dictionary carry-over, while one sequencer
//! writes entries strictly in input order. CPU and memory use are bounded by
//! two rate limiters. Every entry carries the same fixed timestamp, so
//! identical inputs produce byte-identical archives.
//!
//! ## Quick Start
//!
//! ### Zipping a directory tree
//!
//! ```rust,no_run
//! use parzip::{FileArgsBuilder, ZipArgs, ZipOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut files = FileArgsBuilder::new();
//!     files.source_prefix_to_strip("out").dir("out/classes");
//!
//!     let args = ZipArgs::new("classes.zip")
//!         .file_args(files.build()?)
//!         .options(ZipOptions::new().level(9)?.directories(true));
//!     parzip::zip(&args)
//! }
//! ```
//!
//! ### Writing explicit mappings
//!
//! ```rust,no_run
//! use parzip::{CompressionMethod, PathMapping, Zipper, ZipOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mappings = vec![
//!         PathMapping::new("docs/readme.txt", "README", CompressionMethod::Deflate),
//!         PathMapping::new("images/logo.png", "logo.png", CompressionMethod::Store),
//!     ];
//!     let archive = Zipper::new(ZipOptions::new().jobs(4)).write_to(mappings, Vec::new())?;
//!     std::fs::write("out.zip", archive)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Building a jar
//!
//! ```rust,no_run
//! use parzip::{FileArgsBuilder, ZipArgs, ZipOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut files = FileArgsBuilder::new();
//!     files.source_prefix_to_strip("build/classes").dir("build/classes");
//!
//!     let options = ZipOptions::new()
//!         .emulate_jar(true)
//!         .manifest("src/MANIFEST.MF")
//!         .write_if_changed(true);
//!     parzip::zip(&ZipArgs::new("app.jar").file_args(files.build()?).options(options))
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and
//! installs no logger of its own.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod archive_path;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod format;
pub mod jar;
pub mod mapping;
pub mod rate_limit;
pub mod timestamp;
pub mod write;

pub use codec::CompressionMethod;
pub use error::{Error, Result};
pub use timestamp::DosDateTime;

// Re-export path mapping API
pub use mapping::{FileArg, FileArgsBuilder, FileSelector, PathMapping, ResolveOptions, resolve};

// Re-export writing API at crate root for convenience
pub use write::{ZipArgs, ZipOptions, Zipper, zip, zip_to};

// Re-export building blocks
pub use format::{FileHeader, ZipWriter};
pub use rate_limit::{CpuRateLimiter, MemoryRateLimiter, RateLimiter, Reservation};
