//! Process exit codes.
//!
//! Argument problems are distinguished from inconsistent inputs so build
//! systems can tell a misconfigured rule from a broken input tree.

use parzip::Error;

/// The archive was written.
pub const SUCCESS: i32 = 0;
/// Writing failed for a reason not covered below.
pub const FATAL_ERROR: i32 = 2;
/// Inputs map onto the archive inconsistently
pub const BAD_INPUT: i32 = 3;
/// Reading a source or writing the output failed.
pub const IO_ERROR: i32 = 5;
/// Options were malformed or contradictory.
pub const BAD_ARGS: i32 = 255;

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadInput,
    IoError,
    BadArgs,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadInput => BAD_INPUT,
            Self::IoError => IO_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Classifies an error for the process exit status.
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::ManifestWithoutJar
        | Error::InvalidCompressionLevel { .. }
        | Error::MissingOutputPath
        | Error::InvalidPattern { .. }
        | Error::InvalidDateTime(_) => ExitCode::BadArgs,
        e if e.is_input_error() => ExitCode::BadInput,
        _ => ExitCode::FatalError,
    }
}
