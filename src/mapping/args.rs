//! File arguments and their builder.

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// One group of sources sharing the same destination rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileArg {
    /// Prefix prepended to every destination.
    pub path_prefix_in_zip: String,
    /// Prefix removed from every source path to form its destination.
    pub source_prefix_to_strip: PathBuf,
    /// Source files or glob patterns.
    pub source_files: Vec<String>,
    /// Directory whose whole tree is added.
    pub glob_dir: Option<PathBuf>,
    /// Use only the file name of each source as its destination.
    pub junk_paths: bool,
    /// Destination of the single file in `source_files`, replacing the computed one.
    pub explicit_path_in_zip: Option<String>,
}

/// Accumulates [`FileArg`]s from an ordered sequence of options.
///
/// Settings like the prefix to strip are sticky: they apply to every source
/// added after them until changed. An explicit destination only applies to
/// the next [`file`](Self::file).
///
/// # Example
///
/// ```rust
/// use parzip::FileArgsBuilder;
///
/// let mut builder = FileArgsBuilder::new();
/// builder
///     .source_prefix_to_strip("out/gen")
///     .path_prefix_in_zip("assets")
///     .file("out/gen/*.png")
///     .explicit_path_in_zip("icon.png")
///     .file("res/launcher.png");
/// let args = builder.build()?;
/// assert_eq!(args.len(), 2);
/// assert_eq!(args[1].explicit_path_in_zip.as_deref(), Some("icon.png"));
/// # Ok::<(), parzip::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct FileArgsBuilder {
    state: FileArg,
    args: Vec<FileArg>,
    error: Option<crate::Error>,
}

impl FileArgsBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether destinations keep only the file name. Clears the prefix to strip.
    pub fn junk_paths(&mut self, junk: bool) -> &mut Self {
        self.state.junk_paths = junk;
        self.state.source_prefix_to_strip = PathBuf::new();
        self
    }

    /// Sets the prefix removed from source paths. Turns junk paths off.
    pub fn source_prefix_to_strip(&mut self, prefix: impl Into<PathBuf>) -> &mut Self {
        self.state.junk_paths = false;
        self.state.source_prefix_to_strip = prefix.into();
        self
    }

    /// Sets the prefix prepended to destinations.
    pub fn path_prefix_in_zip(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.state.path_prefix_in_zip = prefix.into();
        self
    }

    /// Sets the destination of the next file.
    pub fn explicit_path_in_zip(&mut self, path: impl Into<String>) -> &mut Self {
        self.state.explicit_path_in_zip = Some(path.into());
        self
    }

    /// Adds a file or glob pattern.
    pub fn file(&mut self, name: impl Into<String>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let mut arg = self.state.clone();
        arg.source_files = vec![name.into()];
        self.args.push(arg);
        self.state.explicit_path_in_zip = None;
        self
    }

    /// Adds every file and directory below `dir`.
    pub fn dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let mut arg = self.state.clone();
        arg.glob_dir = Some(dir.into());
        arg.explicit_path_in_zip = None;
        self.args.push(arg);
        self
    }

    /// Adds the whitespace-separated sources listed in a file.
    pub fn list(&mut self, path: impl AsRef<Path>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match fs::read_to_string(path.as_ref()) {
            Ok(contents) => {
                let mut arg = self.state.clone();
                arg.source_files = contents.split_whitespace().map(str::to_string).collect();
                arg.explicit_path_in_zip = None;
                self.args.push(arg);
            }
            Err(err) => self.error = Some(err.into()),
        }
        self
    }

    /// Adds the sources listed in a response file.
    ///
    /// Entries are taken literally: glob characters in them do not expand.
    pub fn rsp_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match fs::read(path.as_ref()) {
            Ok(contents) => {
                let mut arg = self.state.clone();
                arg.source_files = parse_rsp(&contents)
                    .iter()
                    .map(|entry| glob::Pattern::escape(entry))
                    .collect();
                arg.explicit_path_in_zip = None;
                self.args.push(arg);
            }
            Err(err) => self.error = Some(err.into()),
        }
        self
    }

    /// Returns the accumulated arguments, or the first error hit while reading lists.
    pub fn build(self) -> Result<Vec<FileArg>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.args),
        }
    }
}

/// Splits response-file contents into arguments.
///
/// Whitespace separates arguments. Single quotes take everything literally;
/// inside double quotes a backslash only escapes `"` and `\`; outside quotes
/// a backslash escapes any character.
pub fn parse_rsp(contents: &[u8]) -> Vec<String> {
    let mut args = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut escaping = false;
    let mut quote: Option<u8> = None;

    for &c in contents {
        if escaping {
            if quote == Some(b'"') && c != b'"' && c != b'\\' {
                current.push(b'\\');
            }
            current.push(c);
            escaping = false;
            continue;
        }
        match (quote, c) {
            (q, b'\\') if q != Some(b'\'') => escaping = true,
            (None, b'\'' | b'"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, c) if c.is_ascii_whitespace() => {
                if !current.is_empty() {
                    args.push(String::from_utf8_lossy(&current).into_owned());
                    current.clear();
                }
            }
            (_, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(String::from_utf8_lossy(&current).into_owned());
    }
    args
}
