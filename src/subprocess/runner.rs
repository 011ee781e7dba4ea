use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::ProcessError;

#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    /// Full argument vector, program first
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Shell-quoted rendering used in logs and error messages
    pub fn command_line(&self) -> String {
        shell_words::join(self.argv())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    Error(i32),
    Timeout,
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            _ => None,
        }
    }
}

/// One finished (or abandoned) external command invocation.
///
/// Values are only produced by a [`ProcessRunner`]; callers read them to decide
/// success and to extract status lines, hashes and file content.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub argv: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl CommandResult {
    pub fn new(
        command: &ProcessCommand,
        status: ExitStatus,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            argv: command.argv(),
            working_dir: command.working_dir.clone(),
            status,
            stdout,
            stderr,
            duration,
            timeout: command.timeout,
        }
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.status, ExitStatus::Timeout)
    }

    pub fn command_line(&self) -> String {
        shell_words::join(&self.argv)
    }

    /// Trimmed stdout, the common case for single-value queries
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Best available explanation of a failure: stderr, then stdout
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match &self.status {
            ExitStatus::Timeout => "timed out without output".to_string(),
            ExitStatus::Signal(signal) => format!("terminated by signal {signal}"),
            _ => "Unknown error".to_string(),
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command to completion.
    ///
    /// A non-zero exit or an elapsed timeout is reported through
    /// [`CommandResult::status`]; `Err` is reserved for spawn and pipe failures.
    async fn run(&self, command: ProcessCommand) -> Result<CommandResult, ProcessError>;
}

pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Log command execution details
    fn log_command_start(command: &ProcessCommand) {
        tracing::debug!("Executing subprocess: {}", command.command_line());

        if let Some(ref dir) = command.working_dir {
            tracing::trace!("Working directory: {:?}", dir);
        }

        if !command.env.is_empty() {
            tracing::trace!("Environment overrides: {:?}", command.env);
        }
    }

    /// Configure the command with environment, working directory and pipes
    fn configure_command(command: &ProcessCommand) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);

        // Own process group so a timeout can take down helpers such as git-annex
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd.args(&command.args);

        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    /// Map spawn error to ProcessError
    fn map_spawn_error(error: std::io::Error, program: &str) -> ProcessError {
        if error.kind() == std::io::ErrorKind::NotFound {
            tracing::error!("Command '{}' not found on PATH", program);
            ProcessError::CommandNotFound(program.to_string())
        } else {
            tracing::error!("Failed to spawn '{}': {:?}", program, error);
            ProcessError::Io(error)
        }
    }

    /// Append everything readable from `reader` to `sink`.
    ///
    /// Reads in chunks so that bytes collected before a timeout stay in `sink`.
    async fn drain<R>(reader: Option<&mut R>, sink: &mut Vec<u8>) -> Result<(), ProcessError>
    where
        R: AsyncRead + Unpin,
    {
        let Some(reader) = reader else {
            return Ok(());
        };

        let mut chunk = [0u8; 8192];
        loop {
            let read = reader.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            sink.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    /// Kill the whole process group of a child that overran its timeout
    async fn terminate(child: &mut tokio::process::Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                    tracing::debug!("killpg({}) failed: {}", pid, e);
                }
            }
        }

        if let Err(e) = child.kill().await {
            tracing::debug!("Failed to kill timed out child: {}", e);
        }
    }

    /// Convert process exit status to our ExitStatus enum
    fn parse_exit_status(status: std::process::ExitStatus) -> ExitStatus {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            ExitStatus::Signal(signal)
        } else {
            ExitStatus::Error(1)
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus::Error(1)
    }

    /// Log the process execution result
    fn log_result(result: &CommandResult) {
        let command_str = result.command_line();

        match &result.status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    result.duration,
                    command_str
                );
                tracing::trace!("Stdout length: {} bytes", result.stdout.len());
            }
            ExitStatus::Error(code) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    code,
                    result.duration,
                    command_str
                );
                if !result.stderr.is_empty() {
                    tracing::trace!("Stderr: {}", result.stderr);
                }
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {}",
                    signal,
                    result.duration,
                    command_str
                );
            }
            ExitStatus::Timeout => {
                tracing::warn!(
                    "Subprocess timed out after {:?}: {}",
                    result.duration,
                    command_str
                );
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<CommandResult, ProcessError> {
        let start = Instant::now();
        Self::log_command_start(&command);

        let mut cmd = Self::configure_command(&command);
        let mut child = cmd
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &command.program))?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let waited = {
            let collect = async {
                let (out, err, status) = tokio::join!(
                    Self::drain(stdout_pipe.as_mut(), &mut stdout),
                    Self::drain(stderr_pipe.as_mut(), &mut stderr),
                    child.wait()
                );
                out?;
                err?;
                status.map_err(ProcessError::Io)
            };

            match command.timeout {
                Some(limit) => tokio::time::timeout(limit, collect).await.ok(),
                None => Some(collect.await),
            }
        };

        let status = match waited {
            Some(Ok(status)) => Self::parse_exit_status(status),
            Some(Err(e)) => return Err(e),
            None => {
                Self::terminate(&mut child).await;
                ExitStatus::Timeout
            }
        };

        let result = CommandResult::new(
            &command,
            status,
            String::from_utf8_lossy(&stdout).to_string(),
            String::from_utf8_lossy(&stderr).to_string(),
            start.elapsed(),
        );

        Self::log_result(&result);
        Ok(result)
    }
}
