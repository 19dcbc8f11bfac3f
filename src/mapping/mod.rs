//! Resolution of file arguments into destination mappings.
//!
//! The archive writer consumes a flat, ordered list of [`PathMapping`]s.
//! This module builds that list from [`FileArg`]s: it expands glob patterns
//! and directory trees, filters sources through a [`FileSelector`],
//! computes each destination and picks a compression method.
//!
//! # Example
//!
//! ```rust,no_run
//! use parzip::mapping::{FileArgsBuilder, ResolveOptions, resolve};
//!
//! let mut builder = FileArgsBuilder::new();
//! builder.source_prefix_to_strip("out").dir("out/classes");
//! let args = builder.build()?;
//!
//! let mappings = resolve(&args, &ResolveOptions::default())?;
//! for mapping in &mappings {
//!     println!("{} <- {}", mapping.dest, mapping.src.display());
//! }
//! # Ok::<(), parzip::Error>(())
//! ```

mod args;
mod selector;

pub use args::{FileArg, FileArgsBuilder, parse_rsp};
pub use selector::FileSelector;

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive_path;
use crate::codec::CompressionMethod;
use crate::{Error, Result};

/// One archive entry to produce: where it goes, where it comes from, how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    /// Destination name inside the archive.
    pub dest: String,
    /// Source path on disk.
    pub src: PathBuf,
    /// Requested compression method.
    pub method: CompressionMethod,
}

impl PathMapping {
    /// Creates a mapping.
    pub fn new(dest: impl Into<String>, src: impl Into<PathBuf>, method: CompressionMethod) -> Self {
        Self {
            dest: dest.into(),
            src: src.into(),
            method,
        }
    }
}

/// Settings that influence how sources become mappings.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Destinations that are always stored uncompressed.
    pub non_deflated_files: BTreeSet<String>,
    /// Store every entry (compression level 0).
    pub store_only: bool,
    /// Warn about missing sources instead of failing.
    pub ignore_missing_files: bool,
    /// Descend through symlinked directories.
    pub follow_symlinks: bool,
    /// Include/exclude filter applied to source paths.
    pub selector: FileSelector,
}

/// Expands file arguments into mappings, in argument order.
pub fn resolve(args: &[FileArg], options: &ResolveOptions) -> Result<Vec<PathMapping>> {
    let mut mappings = Vec::new();
    for arg in args {
        let mut sources = Vec::new();
        for pattern in &arg.source_files {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            let matches = expand_source(pattern)?;
            if matches.is_empty() {
                missing(Path::new(pattern), options)?;
            }
            sources.extend(matches);
        }
        if let Some(dir) = &arg.glob_dir {
            sources.extend(expand_dir(dir, options)?);
        }

        for src in sources {
            if !options.selector.matches(&src.to_string_lossy()) {
                log::debug!("excluding {}", src.display());
                continue;
            }
            mappings.push(map_source(arg, src, options)?);
        }
    }
    Ok(mappings)
}

fn map_source(arg: &FileArg, src: PathBuf, options: &ResolveOptions) -> Result<PathMapping> {
    let relative = if let Some(explicit) = &arg.explicit_path_in_zip {
        archive_path::clean(explicit)
    } else if arg.junk_paths {
        src.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        let rel = archive_path::relative_to(&src, &arg.source_prefix_to_strip).ok_or_else(|| {
            Error::IncorrectRelativeRoot {
                path: src.clone(),
                relative_root: arg.source_prefix_to_strip.clone(),
            }
        })?;
        archive_path::from_fs_path(&rel)
    };
    let dest = archive_path::join(&arg.path_prefix_in_zip, &relative);

    let method = if options.store_only || options.non_deflated_files.contains(&dest) {
        CompressionMethod::Store
    } else {
        CompressionMethod::Deflate
    };
    Ok(PathMapping { dest, src, method })
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn expand_source(pattern: &str) -> Result<Vec<PathBuf>> {
    if !has_glob_meta(pattern) {
        let path = PathBuf::from(pattern);
        return match fs::symlink_metadata(&path) {
            Ok(_) => Ok(vec![path]),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        };
    }

    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths = glob::glob_with(pattern, options).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })?;
    let mut matches = paths
        .map(|entry| entry.map_err(|e| Error::Io(e.into_error())))
        .collect::<Result<Vec<_>>>()?;
    matches.sort();
    Ok(matches)
}

fn expand_dir(dir: &Path, options: &ResolveOptions) -> Result<Vec<PathBuf>> {
    match fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            let err = io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", dir.display()),
            );
            return if options.ignore_missing_files {
                log::warn!("{err}");
                Ok(Vec::new())
            } else {
                Err(err.into())
            };
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            missing(dir, options)?;
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    }

    WalkDir::new(dir)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            entry
                .map(walkdir::DirEntry::into_path)
                .map_err(|e| Error::Io(e.into()))
        })
        .collect()
}

fn missing(path: &Path, options: &ResolveOptions) -> Result<()> {
    let err = io::Error::new(
        io::ErrorKind::NotFound,
        format!("lstat {}: no such file or directory", path.display()),
    );
    if options.ignore_missing_files {
        log::warn!("{err}");
        Ok(())
    } else {
        Err(err.into())
    }
}
