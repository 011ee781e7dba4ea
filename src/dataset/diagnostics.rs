//! Read-only checks used when something looks wrong with a dataset.
//!
//! Nothing here fails on a non-zero exit; every command outcome is captured
//! and returned so the caller can show the full picture.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{commands::Tools, normalize_relative, DatasetHandle};
use crate::error::Result;
use crate::subprocess::{CheckMode, CommandGateway};

/// One captured command invocation
#[derive(Debug, Clone, Serialize)]
pub struct CommandCapture {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandCapture {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub dataset: PathBuf,
    pub content_tracked: bool,
    pub datalad_status: CommandCapture,
    pub annex_status: CommandCapture,
    pub git_porcelain: CommandCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct Probe {
    pub tool: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RestorePreflight {
    pub dataset_path: PathBuf,
    pub file_path: String,
    pub revision: String,
    pub dataset_exists: bool,
    pub commit_exists: bool,
    pub file_in_commit: bool,
    pub file_present: bool,
    pub errors: Vec<String>,
}

impl RestorePreflight {
    pub fn ready(&self) -> bool {
        self.dataset_exists && self.commit_exists && self.file_in_commit
    }
}

#[derive(Clone)]
pub struct DatasetDiagnostics {
    gateway: CommandGateway,
    tools: Tools,
    probe_timeout: Duration,
}

impl DatasetDiagnostics {
    pub fn new(gateway: CommandGateway, tools: Tools, probe_timeout: Duration) -> Self {
        Self {
            gateway,
            tools,
            probe_timeout,
        }
    }

    async fn capture(&self, argv: &[String], dir: &Path, timeout: Option<Duration>) -> CommandCapture {
        let command = shell_words::join(argv);
        match self
            .gateway
            .execute(argv, dir, timeout, CheckMode::Lenient)
            .await
        {
            Ok(result) => CommandCapture {
                command,
                exit_code: result.exit_code(),
                stdout: result.stdout,
                stderr: result.stderr,
                error: None,
            },
            Err(e) => {
                debug!("Diagnostic command `{}` failed: {}", command, e);
                let (stdout, stderr) = e
                    .result()
                    .map(|r| (r.stdout.clone(), r.stderr.clone()))
                    .unwrap_or_default();
                CommandCapture {
                    command,
                    exit_code: None,
                    stdout,
                    stderr,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Capture every status view of the dataset
    pub async fn snapshot(&self, dataset_path: impl AsRef<Path>) -> Result<StatusSnapshot> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();

        Ok(StatusSnapshot {
            dataset: root.to_path_buf(),
            content_tracked: dataset.is_content_tracked(),
            datalad_status: self.capture(&self.tools.datalad_status(), root, None).await,
            annex_status: self.capture(&self.tools.datalad_status_annex(), root, None).await,
            git_porcelain: self.capture(&self.tools.git_status_porcelain(), root, None).await,
        })
    }

    /// Check that the content-tracking tool can be executed
    pub async fn probe(&self) -> Probe {
        let capture = self
            .capture(
                &self.tools.datalad_version(),
                &std::env::temp_dir(),
                Some(self.probe_timeout),
            )
            .await;

        let tool = self.tools.datalad_program().to_string();
        if capture.succeeded() {
            Probe {
                tool,
                available: true,
                version: Some(capture.stdout.trim().to_string()),
                error: None,
            }
        } else {
            let error = capture.error.clone().unwrap_or_else(|| {
                let text = capture.stderr.trim();
                if text.is_empty() {
                    format!("exited with code {:?}", capture.exit_code)
                } else {
                    text.to_string()
                }
            });
            Probe {
                tool,
                available: false,
                version: None,
                error: Some(error),
            }
        }
    }

    /// Report whether a file restore would pass its preconditions.
    ///
    /// Never fails; problems land in `errors`.
    pub async fn restore_preflight(
        &self,
        dataset_path: impl AsRef<Path>,
        file_path: &str,
        revision: &str,
    ) -> RestorePreflight {
        let file_path = normalize_relative(file_path);
        let mut report = RestorePreflight {
            dataset_path: dataset_path.as_ref().to_path_buf(),
            file_path: file_path.clone(),
            revision: revision.to_string(),
            ..RestorePreflight::default()
        };

        let dataset = match DatasetHandle::open_vcs(dataset_path) {
            Ok(d) => d,
            Err(e) => {
                report.errors.push(e.to_string());
                return report;
            }
        };
        report.dataset_exists = true;
        report.file_present = dataset.join(&file_path).exists();

        let commit = self
            .capture(&self.tools.git_commit_exists(revision), dataset.root(), None)
            .await;
        report.commit_exists = commit.succeeded();
        if !report.commit_exists {
            report
                .errors
                .push(format!("Commit {revision} does not exist"));
            return report;
        }

        let blob = self
            .capture(&self.tools.git_blob_exists(revision, &file_path), dataset.root(), None)
            .await;
        report.file_in_commit = blob.succeeded();
        if !report.file_in_commit {
            report
                .errors
                .push(format!("File {file_path} does not exist in commit {revision}"));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;
    use tempfile::TempDir;

    fn diagnostics() -> (DatasetDiagnostics, MockProcessRunner) {
        let (gateway, mock) = CommandGateway::mock();
        (
            DatasetDiagnostics::new(gateway, Tools::default(), Duration::from_secs(10)),
            mock,
        )
    }

    fn vcs_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_probe_available() {
        let (diag, mut mock) = diagnostics();
        mock.expect_command("datalad")
            .with_exact_args(&["--version"])
            .returns_stdout("datalad 1.1.0\n")
            .finish();

        let probe = diag.probe().await;
        assert!(probe.available);
        assert_eq!(probe.version.as_deref(), Some("datalad 1.1.0"));
        let call = &mock.get_call_history()[0];
        assert_eq!(call.timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_probe_missing_tool() {
        let (diag, mut mock) = diagnostics();
        mock.expect_command("datalad").returns_not_found().finish();

        let probe = diag.probe().await;
        assert!(!probe.available);
        assert!(probe.error.unwrap().contains("datalad"));
    }

    #[tokio::test]
    async fn test_snapshot_captures_failures() {
        let dir = vcs_dir();
        let (diag, mut mock) = diagnostics();
        mock.expect_command("datalad")
            .with_exact_args(&["status"])
            .returns_stdout("modified: results (dataset)\n")
            .finish();
        mock.expect_command("datalad")
            .with_exact_args(&["status", "--annex"])
            .returns_exit_code(1)
            .returns_stderr("annex not initialised")
            .finish();
        mock.expect_command("git")
            .with_exact_args(&["status", "--porcelain"])
            .returns_stdout(" M results\n")
            .finish();

        let snapshot = diag.snapshot(dir.path()).await.unwrap();
        assert!(!snapshot.content_tracked);
        assert!(snapshot.datalad_status.succeeded());
        assert_eq!(snapshot.annex_status.exit_code, Some(1));
        assert_eq!(snapshot.annex_status.stderr, "annex not initialised");
        assert_eq!(snapshot.git_porcelain.stdout, " M results\n");
    }

    #[tokio::test]
    async fn test_preflight_reports_missing_file() {
        let dir = vcs_dir();
        let (diag, mut mock) = diagnostics();
        mock.expect_command("git")
            .with_exact_args(&["cat-file", "-e", "abc123^{commit}"])
            .returns_success()
            .finish();
        mock.expect_command("git")
            .with_exact_args(&["cat-file", "-e", "abc123:results/x.csv"])
            .returns_exit_code(128)
            .finish();

        let report = diag
            .restore_preflight(dir.path(), "./results/x.csv", "abc123")
            .await;
        assert!(report.dataset_exists);
        assert!(report.commit_exists);
        assert!(!report.file_in_commit);
        assert!(!report.ready());
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_preflight_without_dataset() {
        let (diag, mock) = diagnostics();
        let report = diag
            .restore_preflight("/nonexistent/dataset", "a.txt", "HEAD")
            .await;
        assert!(!report.dataset_exists);
        assert!(!report.errors.is_empty());
        assert!(mock.get_call_history().is_empty());
    }
}
