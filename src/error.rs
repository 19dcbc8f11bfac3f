//! Error types for archive creation.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when building a ZIP archive, along with a convenient
//! [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! Every fallible operation in this crate returns `Result<T, Error>`. The
//! first error raised anywhere in the compression pipeline wins: workers stop,
//! the partially written output is discarded and the error is returned to the
//! caller unchanged.
//!
//! ```rust,no_run
//! use parzip::{Error, ZipArgs};
//!
//! fn build(args: &ZipArgs) -> parzip::Result<()> {
//!     match parzip::zip(args) {
//!         Ok(()) => Ok(()),
//!
//!         // Two inputs claim the same destination
//!         Err(e @ Error::ConflictingFile { .. }) => {
//!             eprintln!("duplicate destination: {}", e);
//!             Err(e)
//!         }
//!
//!         // A source file disappeared
//!         Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
//!             eprintln!("missing input: {}", e);
//!             Err(Error::Io(e))
//!         }
//!
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The error type for archive creation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading a source or writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A destination path is used both as a directory and as a file.
    #[error(
        "destination {dest:?} is both a directory {dir_source:?} and a file {file_source:?}"
    )]
    DirectoryFileConflict {
        /// The contested destination path.
        dest: String,
        /// The source that introduced the directory.
        dir_source: PathBuf,
        /// The source that introduced the file.
        file_source: PathBuf,
    },

    /// Two different sources map to the same destination file.
    #[error("destination {dest:?} has two files {previous:?} and {current:?}")]
    ConflictingFile {
        /// The contested destination path.
        dest: String,
        /// The source that was added first.
        previous: PathBuf,
        /// The source that collided with it.
        current: PathBuf,
    },

    /// A source is neither a regular file, a directory, nor a symlink.
    #[error("{} is not a file, directory, or symlink", path.display())]
    UnsupportedFileType {
        /// The offending source path.
        path: PathBuf,
    },

    /// A source path does not live under the prefix it should be made relative to.
    #[error("path {} is outside relative root {}", path.display(), relative_root.display())]
    IncorrectRelativeRoot {
        /// The source path.
        path: PathBuf,
        /// The prefix that should have been stripped.
        relative_root: PathBuf,
    },

    /// A manifest was supplied without enabling jar emulation.
    #[error("a manifest can only be added in jar mode")]
    ManifestWithoutJar,

    /// Compression level outside the supported range.
    #[error("Invalid compression level: {level} (valid range: 0-9)")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u32,
    },

    /// The output path is empty.
    #[error("output file path must be nonempty")]
    MissingOutputPath,

    /// A glob pattern could not be parsed.
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser message.
        reason: String,
    },

    /// A date/time cannot be represented in the MS-DOS format.
    #[error("Invalid DOS date/time: {0}")]
    InvalidDateTime(String),

    /// An entry name was written twice to the same archive.
    #[error("Entry {name:?} already exists in the archive")]
    DuplicateEntry {
        /// The duplicated entry name.
        name: String,
    },

    /// A header was created while another entry was still open.
    #[error("Cannot start entry {name:?} while {open:?} is still being written")]
    EntryInProgress {
        /// The entry that was requested.
        name: String,
        /// The entry that is still open.
        open: String,
    },

    /// Data was written or an entry closed with no entry open.
    #[error("No entry is open for writing")]
    NoOpenEntry,

    /// The number of bytes written for an entry differs from its header.
    #[error("Entry {name:?} declared {expected} bytes but {actual} were written")]
    EntrySizeMismatch {
        /// The entry name.
        name: String,
        /// Size recorded in the header.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// The worker pool could not be created.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The operation was cancelled because another part of the pipeline failed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if the error was caused by the set of inputs rather than
    /// by the environment, i.e. rerunning with the same inputs fails the same way.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::DirectoryFileConflict { .. }
                | Error::ConflictingFile { .. }
                | Error::UnsupportedFileType { .. }
                | Error::IncorrectRelativeRoot { .. }
                | Error::ManifestWithoutJar
                | Error::InvalidCompressionLevel { .. }
                | Error::MissingOutputPath
                | Error::InvalidPattern { .. }
                | Error::InvalidDateTime(_)
        )
    }

    /// Returns true if this is a cancellation rather than a root cause.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns the archive destination associated with this error, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Error::DirectoryFileConflict { dest, .. } | Error::ConflictingFile { dest, .. } => {
                Some(dest)
            }
            Error::DuplicateEntry { name }
            | Error::EntryInProgress { name, .. }
            | Error::EntrySizeMismatch { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A specialized Result type for archive creation.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_conflicting_file_display() {
        let err = Error::ConflictingFile {
            dest: "a/b.txt".into(),
            previous: PathBuf::from("x/b.txt"),
            current: PathBuf::from("y/b.txt"),
        };
        assert_eq!(
            err.to_string(),
            r#"destination "a/b.txt" has two files "x/b.txt" and "y/b.txt""#
        );
        assert!(err.is_input_error());
        assert_eq!(err.destination(), Some("a/b.txt"));
    }

    #[test]
    fn test_directory_conflict_display() {
        let err = Error::DirectoryFileConflict {
            dest: "lib".into(),
            dir_source: PathBuf::from("src/lib/x.so"),
            file_source: PathBuf::from("lib"),
        };
        assert!(err.to_string().contains("both a directory"));
        assert_eq!(err.destination(), Some("lib"));
    }

    #[test]
    fn test_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::MissingOutputPath.is_cancelled());
        assert_eq!(Error::Cancelled.destination(), None);
    }

    #[test]
    fn test_size_mismatch_destination() {
        let err = Error::EntrySizeMismatch {
            name: "big.bin".into(),
            expected: 10,
            actual: 7,
        };
        assert_eq!(err.destination(), Some("big.bin"));
        assert!(err.to_string().contains("declared 10 bytes"));
    }
}
