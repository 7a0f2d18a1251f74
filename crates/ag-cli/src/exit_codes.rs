//! Exit codes for the `anomaly-grid` CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/input errors (recoverable by user action)
//! - 20-29: internal errors (bugs, should be reported)

use ag_common::Error;

/// Exit codes for `anomaly-grid` commands.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed.
    Clean = 0,

    /// Invalid arguments or detector parameters.
    ArgsError = 10,

    /// Malformed sequence or label input.
    InputError = 11,

    /// Model file has no fitted detector.
    NotFitted = 12,

    /// File I/O, JSON/TOML parsing, snapshot or config errors.
    IoError = 13,

    /// Internal error (bug - please report).
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::NotFitted => "ERR_NOT_FITTED",
            ExitCode::IoError => "ERR_IO",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidParameter(_) => ExitCode::ArgsError,
            Error::InvalidInput(_) => ExitCode::InputError,
            Error::NotFitted => ExitCode::NotFitted,
            Error::Snapshot(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                ExitCode::IoError
            }
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
