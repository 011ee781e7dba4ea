use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{CommandResult, ExitStatus, ProcessCommand, ProcessRunner};

/// Scripted [`ProcessRunner`] that records every invocation.
///
/// Expectations are matched in registration order. An expectation limited with
/// [`MockCommandConfig::times`] stops matching once used up, which lets a test
/// script "fails first, succeeds later" sequences for the same command line.
/// Unmatched commands fail with [`ProcessError::MockExpectationNotMet`].
#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

#[derive(Clone)]
enum MockResponse {
    Output {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    NotFound,
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: MockResponse,
    times_called: usize,
    expected_times: Option<usize>,
}

impl MockExpectation {
    fn matches(&self, command: &ProcessCommand) -> bool {
        if self.program != command.program {
            return false;
        }
        if let Some(limit) = self.expected_times {
            if self.times_called >= limit {
                return false;
            }
        }
        match self.args_matcher {
            Some(ref matcher) => matcher(&command.args),
            None => true,
        }
    }
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: MockResponse::Output {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                },
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = self.call_history.lock().unwrap();
        let count = history.iter().filter(|cmd| cmd.program == program).count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }

    /// Argument vectors (program first) of every recorded call
    pub fn recorded_argv(&self) -> Vec<Vec<String>> {
        self.get_call_history().iter().map(|c| c.argv()).collect()
    }

    /// Number of recorded calls whose argument vector satisfies `predicate`
    pub fn count_calls<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ProcessCommand) -> bool,
    {
        self.call_history
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| predicate(cmd))
            .count()
    }

    pub fn reset(&mut self) {
        self.expectations.lock().unwrap().clear();
        self.call_history.lock().unwrap().clear();
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<CommandResult, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let mut expectations = self.expectations.lock().unwrap();
        let Some(expectation) = expectations.iter_mut().find(|e| e.matches(&command)) else {
            return Err(ProcessError::MockExpectationNotMet(format!(
                "No expectation found for command: {}",
                command.command_line()
            )));
        };

        expectation.times_called += 1;

        match expectation.response.clone() {
            MockResponse::NotFound => Err(ProcessError::CommandNotFound(command.program)),
            MockResponse::Output {
                status,
                stdout,
                stderr,
            } => {
                let duration = match status {
                    ExitStatus::Timeout => command.timeout.unwrap_or(Duration::from_secs(1)),
                    _ => Duration::from_millis(10),
                };
                Ok(CommandResult::new(&command, status, stdout, stderr, duration))
            }
        }
    }
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    /// Match an exact argument list (program excluded)
    pub fn with_exact_args(self, expected: &[&str]) -> Self {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        self.with_args(move |args| args == expected.as_slice())
    }

    /// Match argument lists that begin with `prefix`
    pub fn with_args_prefix(self, prefix: &[&str]) -> Self {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        self.with_args(move |args| args.starts_with(&prefix))
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        if let MockResponse::Output {
            stdout: ref mut out,
            ..
        } = self.expectation.response
        {
            *out = stdout.to_string();
        }
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        if let MockResponse::Output {
            stderr: ref mut err,
            ..
        } = self.expectation.response
        {
            *err = stderr.to_string();
        }
        self
    }

    pub fn returns_exit_code(self, code: i32) -> Self {
        self.returns_status(if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        })
    }

    pub fn returns_success(self) -> Self {
        self.returns_status(ExitStatus::Success)
    }

    pub fn returns_timeout(self) -> Self {
        self.returns_status(ExitStatus::Timeout)
    }

    /// Simulate an executable missing from PATH
    pub fn returns_not_found(mut self) -> Self {
        self.expectation.response = MockResponse::NotFound;
        self
    }

    fn returns_status(mut self, new_status: ExitStatus) -> Self {
        match self.expectation.response {
            MockResponse::Output { ref mut status, .. } => *status = new_status,
            MockResponse::NotFound => {
                self.expectation.response = MockResponse::Output {
                    status: new_status,
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
        }
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
