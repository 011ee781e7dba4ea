use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::subprocess::ProcessError;

pub mod codes;


pub use codes::{describe_error_code, ErrorCode};

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised by the dataset engine.
///
/// Only unrecoverable conditions surface here. Degraded commits, skipped
/// commits and failed content-tracking saves after a restore are reported in
/// the operation results instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("[E{:04}] Invalid dataset at {}: {reason}", ErrorCode::DATASET_INVALID, .path.display())]
    DatasetInvalid { path: PathBuf, reason: String },

    #[error("[E{:04}] Dataset already exists at {}", ErrorCode::DATASET_EXISTS, .path.display())]
    DatasetExists { path: PathBuf },

    #[error("[E{:04}] Stage directory not found: {}", ErrorCode::DATASET_STAGE_NOT_FOUND, .path.display())]
    StageNotFound { path: PathBuf },

    #[error("[E{:04}] File not found: {}", ErrorCode::DATASET_FILE_NOT_FOUND, .path.display())]
    FileNotFound { path: PathBuf },

    #[error("[E{:04}] Command not found: {program}", ErrorCode::EXEC_COMMAND_NOT_FOUND)]
    CommandNotFound { program: String },

    #[error("[E{:04}] Command `{command}` timed out after {timeout:?}", ErrorCode::EXEC_TIMEOUT)]
    CommandTimedOut {
        command: String,
        timeout: Duration,
        partial_stdout: String,
        partial_stderr: String,
    },

    #[error("[E{:04}] Command `{command}` failed: {detail}", ErrorCode::EXEC_SUBPROCESS_FAILED)]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("[E{:04}] Revision not found: {revision}", ErrorCode::REVISION_NOT_FOUND)]
    RevisionNotFound { revision: String },

    #[error("[E{:04}] File {path} does not exist in revision {revision}", ErrorCode::REVISION_FILE_MISSING)]
    FileNotInRevision { path: String, revision: String },

    #[error("[E{:04}] File {} was not restored", ErrorCode::RESTORE_VERIFICATION_FAILED, .path.display())]
    RestoreVerificationFailed { path: PathBuf },

    #[error("[E{:04}] File {path} in revision {revision} is binary", ErrorCode::REVISION_BINARY_CONTENT)]
    BinaryContent { path: String, revision: String },

    #[error("[E{:04}] Could not parse {what}: {message}", ErrorCode::EXEC_OUTPUT_ERROR)]
    Parse { what: String, message: String },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config { code: u16, message: String },

    #[error("[E{code:04}] IO error: {0}", code = ErrorCode::OTHER_IO)]
    Io(#[from] std::io::Error),

    #[error("[E{code:04}] {0}", code = ErrorCode::EXEC_GENERIC)]
    Execution(String),
}

impl EngineError {
    pub fn dataset_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DatasetInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
        }
    }

    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::DatasetInvalid { .. } => ErrorCode::DATASET_INVALID,
            Self::DatasetExists { .. } => ErrorCode::DATASET_EXISTS,
            Self::StageNotFound { .. } => ErrorCode::DATASET_STAGE_NOT_FOUND,
            Self::FileNotFound { .. } => ErrorCode::DATASET_FILE_NOT_FOUND,
            Self::CommandNotFound { .. } => ErrorCode::EXEC_COMMAND_NOT_FOUND,
            Self::CommandTimedOut { .. } => ErrorCode::EXEC_TIMEOUT,
            Self::CommandFailed { .. } => ErrorCode::EXEC_SUBPROCESS_FAILED,
            Self::RevisionNotFound { .. } => ErrorCode::REVISION_NOT_FOUND,
            Self::FileNotInRevision { .. } => ErrorCode::REVISION_FILE_MISSING,
            Self::RestoreVerificationFailed { .. } => ErrorCode::RESTORE_VERIFICATION_FAILED,
            Self::BinaryContent { .. } => ErrorCode::REVISION_BINARY_CONTENT,
            Self::Parse { .. } => ErrorCode::EXEC_OUTPUT_ERROR,
            Self::Config { code, .. } => *code,
            Self::Io(_) => ErrorCode::OTHER_IO,
            Self::Execution(_) => ErrorCode::EXEC_GENERIC,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::DatasetInvalid { .. }
            | Self::DatasetExists { .. }
            | Self::StageNotFound { .. }
            | Self::FileNotFound { .. } => 3,
            Self::CommandNotFound { .. }
            | Self::CommandTimedOut { .. }
            | Self::CommandFailed { .. }
            | Self::Execution(_)
            | Self::Parse { .. } => 5,
            Self::RevisionNotFound { .. }
            | Self::FileNotInRevision { .. }
            | Self::RestoreVerificationFailed { .. }
            | Self::BinaryContent { .. } => 7,
            Self::Io(_) => 1,
        }
    }
}

impl From<ProcessError> for EngineError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::CommandNotFound(program) => Self::CommandNotFound { program },
            ProcessError::Timeout { timeout, result } => {
                let result = *result;
                Self::CommandTimedOut {
                    command: result.command_line(),
                    timeout,
                    partial_stdout: result.stdout,
                    partial_stderr: result.stderr,
                }
            }
            ProcessError::Failed { result } => Self::CommandFailed {
                command: result.command_line(),
                exit_code: result.exit_code(),
                detail: result.failure_text(),
            },
            ProcessError::Io(e) => Self::Io(e),
            other => Self::Execution(other.to_string()),
        }
    }
}
