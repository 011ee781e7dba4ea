use std::time::Duration;

use super::runner::CommandResult;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command `{}` timed out after {timeout:?}", .result.command_line())]
    Timeout {
        timeout: Duration,
        result: Box<CommandResult>,
    },

    #[error("Command `{}` failed ({}): {}", .result.command_line(), exit_label(.result), .result.failure_text())]
    Failed { result: Box<CommandResult> },

    #[error("Empty command line")]
    EmptyCommand,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

impl ProcessError {
    /// The captured invocation, when the process got far enough to produce one
    pub fn result(&self) -> Option<&CommandResult> {
        match self {
            ProcessError::Timeout { result, .. } | ProcessError::Failed { result } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// Short text suitable for an attempt log entry
    pub fn detail(&self) -> String {
        match self {
            ProcessError::Failed { result } => result.failure_text(),
            ProcessError::Timeout { timeout, result } => {
                let partial = result.failure_text();
                format!("timed out after {timeout:?} ({partial})")
            }
            other => other.to_string(),
        }
    }
}

fn exit_label(result: &CommandResult) -> String {
    match result.exit_code() {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}
