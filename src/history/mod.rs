//! Read access to dataset history, plus the one history-rewriting helper
//! (`revert`).

pub mod age;
pub mod parse;

pub use age::{absolute_age, relative_age};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dataset::{normalize_relative, DatasetHandle, Tools};
use crate::error::{EngineError, Result};
use crate::subprocess::{CheckMode, CommandGateway, CommandResult};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub short_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<FixedOffset>,
    pub subject: String,
    pub body: String,
}

impl CommitRecord {
    pub fn relative_age(&self) -> String {
        relative_age(&self.timestamp, &Utc::now())
    }

    pub fn absolute_age(&self) -> String {
        absolute_age(&self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed { from: String },
    Other { code: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChangeRecord {
    pub path: String,
    #[serde(flatten)]
    pub kind: ChangeKind,
    /// Size in bytes at the revision; absent for deletions
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub revision: String,
    pub head: String,
    pub is_same: bool,
    pub differences: Vec<FileChangeRecord>,
}

/// Working tree position after a checkout
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub revision: String,
    /// Branch name, or `HEAD (<8 chars>)` when detached
    pub branch: String,
    pub head: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevertResult {
    pub reverted: String,
    pub new_head: String,
    pub message: Option<String>,
    pub output: String,
}

/// History queries over one injected gateway
#[derive(Clone)]
pub struct HistoryQueries {
    gateway: CommandGateway,
    tools: Tools,
}

fn is_unborn(result: &CommandResult) -> bool {
    result.stderr.contains("does not have any commits")
}

impl HistoryQueries {
    pub fn new(gateway: CommandGateway, tools: Tools) -> Self {
        Self { gateway, tools }
    }

    /// Up to `limit` commits, newest first. An unborn branch has no history.
    pub async fn commit_history(
        &self,
        dataset_path: impl AsRef<Path>,
        limit: usize,
    ) -> Result<Vec<CommitRecord>> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        self.log(&dataset, &self.tools.git_log(limit)).await
    }

    /// Commits touching `file_path`, following renames when git can
    pub async fn file_history(
        &self,
        dataset_path: impl AsRef<Path>,
        file_path: &str,
        limit: usize,
    ) -> Result<Vec<CommitRecord>> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let path = normalize_relative(file_path);

        let followed = self
            .log(&dataset, &self.tools.git_log_file(limit, &path, true))
            .await?;
        if !followed.is_empty() {
            return Ok(followed);
        }

        debug!("No history with --follow for {}, retrying without", path);
        self.log(&dataset, &self.tools.git_log_file(limit, &path, false))
            .await
    }

    async fn log(&self, dataset: &DatasetHandle, argv: &[String]) -> Result<Vec<CommitRecord>> {
        let result = self
            .gateway
            .execute(argv, dataset.root(), None, CheckMode::Lenient)
            .await?;
        if !result.success() {
            if is_unborn(&result) {
                return Ok(Vec::new());
            }
            return Err(EngineError::CommandFailed {
                command: result.command_line(),
                exit_code: result.exit_code(),
                detail: result.failure_text(),
            });
        }
        parse::parse_log(&result.stdout)
    }

    /// Files changed by `revision`, with their size at that revision
    pub async fn commit_files(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
    ) -> Result<Vec<FileChangeRecord>> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        self.require_revision(root, revision).await?;

        let result = self
            .gateway
            .run(&self.tools.git_show_name_status(revision), root)
            .await?;

        let mut changes = parse::parse_name_status(&result.stdout);
        for change in changes.iter_mut() {
            if change.kind == ChangeKind::Deleted {
                continue;
            }
            change.size = self.blob_size(root, revision, &change.path).await;
        }
        Ok(changes)
    }

    async fn blob_size(&self, root: &Path, revision: &str, path: &str) -> Option<u64> {
        match self
            .gateway
            .execute(
                &self.tools.git_blob_size(revision, path),
                root,
                None,
                CheckMode::Lenient,
            )
            .await
        {
            Ok(result) if result.success() => result.stdout_trimmed().parse().ok(),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not size {}:{}: {}", revision, path, e);
                None
            }
        }
    }

    async fn require_revision(&self, root: &Path, revision: &str) -> Result<()> {
        let check = self
            .gateway
            .execute(
                &self.tools.git_commit_exists(revision),
                root,
                None,
                CheckMode::Lenient,
            )
            .await?;
        if check.success() {
            Ok(())
        } else {
            Err(EngineError::RevisionNotFound {
                revision: revision.to_string(),
            })
        }
    }

    /// Text content of `file_path` as stored in `revision`.
    ///
    /// Output is decoded as UTF-8 with invalid sequences replaced, so this is
    /// for viewing text files. Blobs containing NUL bytes are treated as
    /// binary and rejected with [`EngineError::BinaryContent`]; `restore`
    /// recovers those byte for byte.
    pub async fn file_content(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
        file_path: &str,
    ) -> Result<String> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        let path = normalize_relative(file_path);
        self.require_revision(root, revision).await?;

        let exists = self
            .gateway
            .execute(
                &self.tools.git_blob_exists(revision, &path),
                root,
                None,
                CheckMode::Lenient,
            )
            .await?;
        if !exists.success() {
            return Err(EngineError::FileNotInRevision {
                path,
                revision: revision.to_string(),
            });
        }

        let result = self
            .gateway
            .run(&self.tools.git_show_file(revision, &path), root)
            .await?;
        if result.stdout.contains('\0') {
            return Err(EngineError::BinaryContent {
                path,
                revision: revision.to_string(),
            });
        }
        Ok(result.stdout)
    }

    /// Patch introduced to `file_path` by `revision`
    pub async fn file_diff(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
        file_path: &str,
    ) -> Result<String> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let path = normalize_relative(file_path);
        let result = self
            .gateway
            .run(&self.tools.git_show_file_diff(revision, &path), dataset.root())
            .await?;
        Ok(result.stdout)
    }

    /// Checked-out branch, or `HEAD (<8 chars>)` when detached
    pub async fn current_branch(&self, dataset_path: impl AsRef<Path>) -> Result<String> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();

        let branch = self
            .gateway
            .execute(&self.tools.git_current_branch(), root, None, CheckMode::Lenient)
            .await?;
        if branch.success() && !branch.stdout_trimmed().is_empty() {
            return Ok(branch.stdout_trimmed().to_string());
        }

        let head = self
            .gateway
            .run(&self.tools.git_rev_parse("HEAD"), root)
            .await?;
        let hash = head.stdout_trimmed();
        Ok(format!("HEAD ({})", &hash[..hash.len().min(8)]))
    }

    /// Files that differ between `revision` and the local HEAD
    pub async fn compare_to_local(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
    ) -> Result<Comparison> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        self.require_revision(root, revision).await?;

        let resolved = self
            .gateway
            .run(&self.tools.git_rev_parse(revision), root)
            .await?
            .stdout_trimmed()
            .to_string();
        let head = self
            .gateway
            .run(&self.tools.git_rev_parse("HEAD"), root)
            .await?
            .stdout_trimmed()
            .to_string();

        let differences = if resolved == head {
            Vec::new()
        } else {
            let diff = self
                .gateway
                .run(&self.tools.git_diff_name_status(revision, "HEAD"), root)
                .await?;
            parse::parse_name_status(&diff.stdout)
        };

        Ok(Comparison {
            revision: revision.to_string(),
            is_same: resolved == head,
            head,
            differences,
        })
    }

    /// Create a commit undoing `revision`, optionally replacing its message
    pub async fn revert(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
        message: Option<&str>,
    ) -> Result<RevertResult> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        self.require_revision(root, revision).await?;

        let result = self
            .gateway
            .run(&self.tools.git_revert(revision), root)
            .await?;

        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        if let Some(ref message) = message {
            self.gateway
                .run(&self.tools.git_commit_amend(message), root)
                .await?;
        }

        let head = self
            .gateway
            .run(&self.tools.git_rev_parse("HEAD"), root)
            .await?;

        Ok(RevertResult {
            reverted: revision.to_string(),
            new_head: head.stdout_trimmed().to_string(),
            message,
            output: result.stdout,
        })
    }

    /// Create `branch` at `revision` and switch to it
    pub async fn create_branch(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
        branch: &str,
    ) -> Result<CheckoutResult> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        self.require_revision(root, revision).await?;

        info!("Creating branch {} at {}", branch, revision);
        self.gateway
            .run(&self.tools.git_checkout_new_branch(branch, revision), root)
            .await?;
        self.position_after_checkout(&dataset, revision).await
    }

    /// Check out `revision` with a detached HEAD
    pub async fn checkout_commit(
        &self,
        dataset_path: impl AsRef<Path>,
        revision: &str,
    ) -> Result<CheckoutResult> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        self.require_revision(root, revision).await?;

        info!("Checking out {} (detached)", revision);
        self.gateway
            .run(&self.tools.git_checkout_detached(revision), root)
            .await?;
        self.position_after_checkout(&dataset, revision).await
    }

    async fn position_after_checkout(
        &self,
        dataset: &DatasetHandle,
        revision: &str,
    ) -> Result<CheckoutResult> {
        let branch = self.current_branch(dataset.root()).await?;
        let head = self
            .gateway
            .run(&self.tools.git_rev_parse("HEAD"), dataset.root())
            .await?;
        Ok(CheckoutResult {
            revision: revision.to_string(),
            branch,
            head: head.stdout_trimmed().to_string(),
        })
    }
}
