//! Options and arguments for archive creation.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::mapping::{FileArg, FileSelector, ResolveOptions};
use crate::rate_limit::DEFAULT_MEMORY_LIMIT;
use crate::timestamp::DosDateTime;
use crate::{Error, Result};

/// Default DEFLATE level.
pub const DEFAULT_LEVEL: u32 = 5;

/// How an archive is produced.
///
/// # Example
///
/// ```rust
/// use parzip::ZipOptions;
///
/// let options = ZipOptions::new()
///     .level(9)?
///     .jobs(4)
///     .directories(true)
///     .memory_limit(64 * 1024 * 1024);
/// assert_eq!(options.level, 9);
///
/// // Levels above 9 are rejected
/// assert!(ZipOptions::new().level(10).is_err());
/// # Ok::<(), parzip::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipOptions {
    /// DEFLATE level, 0-9. Level 0 stores every entry.
    pub level: u32,
    /// Concurrent compression tasks; 0 uses the available parallelism.
    pub jobs: usize,
    /// Bytes of file content held in memory at once.
    pub memory_limit: u64,
    /// Emit directory entries.
    pub directories: bool,
    /// Produce a jar: jar ordering, a manifest and directory entries.
    pub emulate_jar: bool,
    /// Manifest source used in jar mode.
    pub manifest: Option<PathBuf>,
    /// Modification time of every entry.
    pub modified: DosDateTime,
    /// Store symlinks as links rather than following them.
    pub store_symlinks: bool,
    /// Warn about missing sources instead of failing.
    pub ignore_missing_files: bool,
    /// Only rewrite the output when its contents change.
    pub write_if_changed: bool,
}

impl Default for ZipOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            jobs: 0,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            directories: false,
            emulate_jar: false,
            manifest: None,
            modified: DosDateTime::DEFAULT,
            store_symlinks: true,
            ignore_missing_files: false,
            write_if_changed: false,
        }
    }
}

impl ZipOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level (0-9).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] for levels above 9.
    pub fn level(mut self, level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::InvalidCompressionLevel { level });
        }
        self.level = level;
        Ok(self)
    }

    /// Sets the compression level, clamping values above 9.
    pub fn level_clamped(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Sets the number of concurrent compression tasks (0 = auto).
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Sets the memory budget in bytes (0 = default).
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Enables or disables directory entries.
    pub fn directories(mut self, enabled: bool) -> Self {
        self.directories = enabled;
        self
    }

    /// Enables or disables jar emulation.
    pub fn emulate_jar(mut self, enabled: bool) -> Self {
        self.emulate_jar = enabled;
        self
    }

    /// Sets the manifest source for jar mode.
    pub fn manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    /// Sets the modification time of every entry.
    pub fn modified(mut self, modified: DosDateTime) -> Self {
        self.modified = modified;
        self
    }

    /// Chooses between storing symlinks and following them.
    pub fn store_symlinks(mut self, store: bool) -> Self {
        self.store_symlinks = store;
        self
    }

    /// Warn about missing sources instead of failing.
    pub fn ignore_missing_files(mut self, ignore: bool) -> Self {
        self.ignore_missing_files = ignore;
        self
    }

    /// Only rewrite the output when its contents change.
    pub fn write_if_changed(mut self, enabled: bool) -> Self {
        self.write_if_changed = enabled;
        self
    }

    /// Returns true if directory entries are written.
    pub fn directories_enabled(&self) -> bool {
        self.directories || self.emulate_jar
    }
}

/// Everything needed to build one archive file.
///
/// # Example
///
/// ```rust,no_run
/// use parzip::{FileArgsBuilder, ZipArgs, ZipOptions};
///
/// let mut files = FileArgsBuilder::new();
/// files.source_prefix_to_strip("build").dir("build/classes");
///
/// let args = ZipArgs::new("out.jar")
///     .file_args(files.build()?)
///     .exclude("**/*.tmp")
///     .options(ZipOptions::new().emulate_jar(true));
/// parzip::zip(&args)?;
/// # Ok::<(), parzip::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZipArgs {
    /// Sources, in order.
    pub file_args: Vec<FileArg>,
    /// Output archive path.
    pub output: PathBuf,
    /// Destinations always stored uncompressed.
    pub non_deflated_files: BTreeSet<String>,
    /// Glob patterns a source must match, if any are given.
    pub include_patterns: Vec<String>,
    /// Glob patterns removing sources.
    pub exclude_patterns: Vec<String>,
    /// Archive options.
    pub options: ZipOptions,
}

impl ZipArgs {
    /// Creates arguments writing to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Replaces the file arguments.
    pub fn file_args(mut self, args: Vec<FileArg>) -> Self {
        self.file_args = args;
        self
    }

    /// Forces a destination to be stored uncompressed.
    pub fn store_file(mut self, dest: impl Into<String>) -> Self {
        self.non_deflated_files.insert(dest.into());
        self
    }

    /// Adds an include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    /// Adds an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Replaces the archive options.
    pub fn options(mut self, options: ZipOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the settings used to resolve file arguments.
    pub fn resolve_options(&self) -> Result<ResolveOptions> {
        Ok(ResolveOptions {
            non_deflated_files: self.non_deflated_files.clone(),
            store_only: self.options.level == 0,
            ignore_missing_files: self.options.ignore_missing_files,
            follow_symlinks: !self.options.store_symlinks,
            selector: FileSelector::new(&self.include_patterns, &self.exclude_patterns)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ZipOptions::default();
        assert_eq!(options.level, 5);
        assert_eq!(options.jobs, 0);
        assert_eq!(options.memory_limit, 512 * 1024 * 1024);
        assert_eq!(options.modified, DosDateTime::DEFAULT);
        assert!(options.store_symlinks);
        assert!(!options.directories_enabled());
    }

    #[test]
    fn test_level_validation() {
        assert!(matches!(
            ZipOptions::new().level(10),
            Err(Error::InvalidCompressionLevel { level: 10 })
        ));
        assert_eq!(ZipOptions::new().level_clamped(42).level, 9);
    }

    #[test]
    fn test_jar_forces_directories() {
        assert!(ZipOptions::new().emulate_jar(true).directories_enabled());
    }

    #[test]
    fn test_resolve_options() {
        let args = ZipArgs::new("out.zip")
            .store_file("a.png")
            .exclude("*.tmp")
            .options(ZipOptions::new().level_clamped(0).store_symlinks(false));
        let resolve = args.resolve_options().unwrap();
        assert!(resolve.store_only);
        assert!(resolve.follow_symlinks);
        assert!(resolve.non_deflated_files.contains("a.png"));
        assert!(!resolve.selector.matches("x.tmp"));
    }

    #[test]
    fn test_bad_pattern() {
        let args = ZipArgs::new("out.zip").include("[");
        assert!(matches!(
            args.resolve_options(),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
