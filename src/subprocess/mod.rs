//! Command gateway: the single place external commands are executed.
//!
//! Every other component reaches `git` and `datalad` through a
//! [`CommandGateway`], which wraps an injected [`ProcessRunner`]. Production code
//! uses [`TokioProcessRunner`]; tests substitute [`MockProcessRunner`], whose
//! call history doubles as an invocation spy. No retries happen here: a failed
//! or timed-out command is reported once and callers decide what comes next.

pub mod builder;
pub mod error;
pub mod mock;
pub mod runner;


pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{CommandResult, ExitStatus, ProcessCommand, ProcessRunner, TokioProcessRunner};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How a non-zero exit is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Non-zero exit becomes [`ProcessError::Failed`]
    Strict,
    /// Non-zero exit is returned as a normal result; the exit code is data
    Lenient,
}

#[derive(Clone)]
pub struct CommandGateway {
    runner: Arc<dyn ProcessRunner>,
    default_timeout: Duration,
}

impl CommandGateway {
    pub fn new(runner: Arc<dyn ProcessRunner>, default_timeout: Duration) -> Self {
        Self {
            runner,
            default_timeout,
        }
    }

    pub fn production(default_timeout: Duration) -> Self {
        Self::new(Arc::new(TokioProcessRunner), default_timeout)
    }

    /// Gateway backed by a fresh mock runner, plus a handle to script and inspect it
    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner, Duration::from_secs(30)), mock)
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute `argv` in `working_dir`.
    ///
    /// Fails with `CommandNotFound` when the executable is missing and with
    /// `Timeout` (partial output attached) when `timeout` elapses. A non-zero
    /// exit only fails in [`CheckMode::Strict`].
    pub async fn execute<S: AsRef<str>>(
        &self,
        argv: &[S],
        working_dir: &Path,
        timeout: Option<Duration>,
        mode: CheckMode,
    ) -> Result<CommandResult, ProcessError> {
        let command = ProcessCommandBuilder::from_argv(argv)?
            .current_dir(working_dir)
            .timeout(timeout.unwrap_or(self.default_timeout))
            .build();

        self.execute_command(command, mode).await
    }

    /// Execute a prepared command under the gateway's failure policy
    pub async fn execute_command(
        &self,
        command: ProcessCommand,
        mode: CheckMode,
    ) -> Result<CommandResult, ProcessError> {
        let result = self.runner.run(command).await?;

        if result.timed_out() {
            let timeout = result.timeout.unwrap_or(result.duration);
            return Err(ProcessError::Timeout {
                timeout,
                result: Box::new(result),
            });
        }

        if mode == CheckMode::Strict && !result.success() {
            return Err(ProcessError::Failed {
                result: Box::new(result),
            });
        }

        Ok(result)
    }

    /// Strict execution with the default timeout
    pub async fn run<S: AsRef<str>>(
        &self,
        argv: &[S],
        working_dir: &Path,
    ) -> Result<CommandResult, ProcessError> {
        self.execute(argv, working_dir, None, CheckMode::Strict)
            .await
    }

    /// Lenient execution with the default timeout
    pub async fn run_lenient<S: AsRef<str>>(
        &self,
        argv: &[S],
        working_dir: &Path,
    ) -> Result<CommandResult, ProcessError> {
        self.execute(argv, working_dir, None, CheckMode::Lenient)
            .await
    }
}
