//! CLI tool for building zip and jar archives in parallel.

mod exit_codes;
mod file_args;

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use exit_codes::ExitCode;
use parzip::{DosDateTime, ZipArgs, ZipOptions};

/// Parallel, deterministic zip archive builder
///
/// File options apply in command-line order: `-C`, `-P` and `-j` affect the
/// sources that follow them, `-e` renames the next `-f` source.
#[derive(Parser, Debug)]
#[command(name = "parzip")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Output archive
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Path to strip from the following sources
    #[arg(short = 'C', value_name = "DIR", action = ArgAction::Append)]
    relative_root: Vec<PathBuf>,

    /// Path prefix inside the archive for the following sources
    #[arg(short = 'P', value_name = "PREFIX", action = ArgAction::Append)]
    prefix: Vec<String>,

    /// Path inside the archive for the next file
    #[arg(short = 'e', value_name = "PATH", action = ArgAction::Append)]
    explicit: Vec<String>,

    /// Junk paths: keep only file names for the following sources
    #[arg(short = 'j')]
    junk_paths: bool,

    /// File or glob to add
    #[arg(short = 'f', value_name = "FILE", action = ArgAction::Append)]
    file: Vec<String>,

    /// Directory to add recursively
    #[arg(short = 'D', value_name = "DIR", action = ArgAction::Append)]
    dir: Vec<PathBuf>,

    /// File listing whitespace-separated sources
    #[arg(short = 'l', value_name = "LIST", action = ArgAction::Append)]
    list: Vec<PathBuf>,

    /// Response file listing sources, with shell-style quoting
    #[arg(short = 'r', value_name = "RSP", action = ArgAction::Append)]
    rsp: Vec<PathBuf>,

    /// Destination to store uncompressed
    #[arg(short = 's', value_name = "DEST")]
    store: Vec<String>,

    /// Exclude sources matching a glob
    #[arg(short = 'x', value_name = "GLOB")]
    exclude: Vec<String>,

    /// Only include sources matching a glob
    #[arg(short = 'i', value_name = "GLOB")]
    include: Vec<String>,

    /// Compression level (0-9)
    #[arg(short = 'L', default_value = "5")]
    level: u32,

    /// Add directory entries
    #[arg(short = 'd')]
    directories: bool,

    /// Order entries and add a manifest like a jar
    #[arg(long)]
    jar: bool,

    /// Manifest to use with --jar
    #[arg(short = 'm', value_name = "MANIFEST")]
    manifest: Option<PathBuf>,

    /// Store symlinks instead of following them
    #[arg(long, default_value = "true", action = ArgAction::Set)]
    symlinks: bool,

    /// Warn about missing sources instead of failing
    #[arg(long)]
    ignore_missing_files: bool,

    /// Only rewrite the output if its contents change
    #[arg(long)]
    write_if_changed: bool,

    /// Number of parallel compression jobs (0 = auto)
    #[arg(long = "parallel", short = 't', default_value = "0", env = "PARZIP_JOBS")]
    jobs: usize,

    /// Memory budget in bytes for file contents (0 = 512 MiB)
    #[arg(long, default_value = "0")]
    memory_limit: u64,

    /// Entry timestamp in seconds since the Unix epoch
    #[arg(long, value_name = "SECS")]
    mtime: Option<i64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    let exit_code = match run(&cli, &matches) {
        Ok(()) => ExitCode::Success,
        Err(err) => {
            eprintln!("Error: {err}");
            exit_codes::error_to_exit_code(&err)
        }
    };
    std::process::exit(exit_code.code());
}

fn run(cli: &Cli, matches: &clap::ArgMatches) -> parzip::Result<()> {
    let file_args = file_args::build_file_args(file_args::ordered_ops(matches))?;

    let mut options = ZipOptions::new()
        .level(cli.level)?
        .jobs(cli.jobs)
        .memory_limit(cli.memory_limit)
        .directories(cli.directories)
        .emulate_jar(cli.jar)
        .store_symlinks(cli.symlinks)
        .ignore_missing_files(cli.ignore_missing_files)
        .write_if_changed(cli.write_if_changed);
    if let Some(manifest) = &cli.manifest {
        options = options.manifest(manifest);
    }
    if let Some(secs) = cli.mtime {
        options = options.modified(DosDateTime::from_unix_secs(secs)?);
    }

    let mut args = ZipArgs::new(&cli.output)
        .file_args(file_args)
        .options(options);
    for dest in &cli.store {
        args = args.store_file(dest);
    }
    for pattern in &cli.include {
        args = args.include(pattern);
    }
    for pattern in &cli.exclude {
        args = args.exclude(pattern);
    }

    parzip::zip(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["parzip", "-o", "out.zip"]).unwrap();
        assert_eq!(cli.level, 5);
        assert!(cli.symlinks);
        assert!(!cli.jar);
        assert_eq!(cli.mtime, None);
    }

    #[test]
    fn test_symlinks_off() {
        let cli = Cli::try_parse_from(["parzip", "-o", "o", "--symlinks", "false"]).unwrap();
        assert!(!cli.symlinks);
    }

    #[test]
    fn test_output_required() {
        assert!(Cli::try_parse_from(["parzip", "-f", "a"]).is_err());
    }
}
