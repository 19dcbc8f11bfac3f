//! Recovers the command-line order of file arguments.
//!
//! Options like `-C` and `-P` affect only the sources that follow them, so
//! the values clap collects per option are merged back into one sequence by
//! their position on the command line.

use std::path::PathBuf;

use clap::ArgMatches;
use parzip::{FileArg, FileArgsBuilder, Result};

/// One positional file option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    RelativeRoot(PathBuf),
    Prefix(String),
    Explicit(String),
    JunkPaths,
    File(String),
    Dir(PathBuf),
    List(PathBuf),
    Rsp(PathBuf),
}

/// Collects file options in command-line order.
pub fn ordered_ops(matches: &ArgMatches) -> Vec<FileOp> {
    let mut ops = Vec::new();
    collect(matches, "relative_root", FileOp::RelativeRoot, &mut ops);
    collect(matches, "prefix", FileOp::Prefix, &mut ops);
    collect(matches, "explicit", FileOp::Explicit, &mut ops);
    collect(matches, "file", FileOp::File, &mut ops);
    collect(matches, "dir", FileOp::Dir, &mut ops);
    collect(matches, "list", FileOp::List, &mut ops);
    collect(matches, "rsp", FileOp::Rsp, &mut ops);
    if matches.get_flag("junk_paths") {
        if let Some(index) = matches.index_of("junk_paths") {
            ops.push((index, FileOp::JunkPaths));
        }
    }
    ops.sort_by_key(|(index, _)| *index);
    ops.into_iter().map(|(_, op)| op).collect()
}

fn collect<T>(
    matches: &ArgMatches,
    id: &str,
    op: impl Fn(T) -> FileOp,
    ops: &mut Vec<(usize, FileOp)>,
) where
    T: Clone + Send + Sync + 'static,
{
    if let (Some(values), Some(indices)) = (matches.get_many::<T>(id), matches.indices_of(id)) {
        ops.extend(indices.zip(values.cloned().map(op)));
    }
}

/// Feeds ordered options through a [`FileArgsBuilder`].
pub fn build_file_args(ops: Vec<FileOp>) -> Result<Vec<FileArg>> {
    let mut builder = FileArgsBuilder::new();
    for op in ops {
        match op {
            FileOp::RelativeRoot(root) => builder.source_prefix_to_strip(root),
            FileOp::Prefix(prefix) => builder.path_prefix_in_zip(prefix),
            FileOp::Explicit(path) => builder.explicit_path_in_zip(path),
            FileOp::JunkPaths => builder.junk_paths(true),
            FileOp::File(file) => builder.file(file),
            FileOp::Dir(dir) => builder.dir(dir),
            FileOp::List(list) => builder.list(list),
            FileOp::Rsp(rsp) => builder.rsp_file(rsp),
        };
    }
    builder.build()
}
