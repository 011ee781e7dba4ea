//! Restoring a single file to its content at an earlier revision.
//!
//! The restored content is persisted in two independent layers: a plain
//! `git` commit, then a `datalad save` when the dataset carries content
//! tracking metadata. A failure in the second layer is reported in the
//! [`RestoreResult`] and never rolls back the first.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dataset::{normalize_relative, DatasetHandle, Tools};
use crate::error::{EngineError, Result};
use crate::subprocess::{CheckMode, CommandGateway, ProcessError};

/// Outcome of one persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerOutcome {
    Committed,
    Skipped { reason: String },
    Failed { error: String },
    NotApplicable,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub path: String,
    pub revision: String,
    pub message: String,
    pub vcs: LayerOutcome,
    pub content_tracking: LayerOutcome,
}

impl RestoreResult {
    pub fn fully_persisted(&self) -> bool {
        !matches!(self.vcs, LayerOutcome::Failed { .. })
            && !matches!(self.content_tracking, LayerOutcome::Failed { .. })
    }
}

pub fn default_restore_message(path: &str, revision: &str) -> String {
    format!("Restore {path} from commit {revision}")
}

#[derive(Clone)]
pub struct FileRestorer {
    gateway: CommandGateway,
    tools: Tools,
}

impl FileRestorer {
    pub fn new(gateway: CommandGateway, tools: Tools) -> Self {
        Self { gateway, tools }
    }

    pub async fn restore(
        &self,
        dataset_path: impl AsRef<Path>,
        file_path: &str,
        revision: &str,
        message: Option<&str>,
    ) -> Result<RestoreResult> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        let root = dataset.root();
        let path = normalize_relative(file_path);
        let revision = revision.trim();

        self.check_preconditions(root, &path, revision).await?;

        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_restore_message(&path, revision));

        info!("Restoring {} from {}", path, revision);
        self.gateway
            .run(&self.tools.git_checkout_file(revision, &path), root)
            .await?;

        let restored = dataset.join(&path);
        if !restored.exists() {
            return Err(EngineError::RestoreVerificationFailed { path: restored });
        }

        self.gateway.run(&self.tools.git_add(&path), root).await?;

        // Only the restored path is inspected and committed; anything else the
        // user staged stays in the index untouched.
        let staged = self
            .gateway
            .execute(&self.tools.git_staged_quiet(&path), root, None, CheckMode::Lenient)
            .await?;
        let vcs = match staged.exit_code() {
            Some(0) => {
                debug!("{} already matches {}, nothing to commit", path, revision);
                LayerOutcome::Skipped {
                    reason: "working tree already matches the revision".to_string(),
                }
            }
            Some(1) => {
                self.gateway
                    .run(&self.tools.git_commit_path(&message, &path), root)
                    .await?;
                LayerOutcome::Committed
            }
            _ => {
                return Err(ProcessError::Failed {
                    result: Box::new(staged),
                }
                .into())
            }
        };

        let content_tracking = if dataset.is_content_tracked() {
            match self
                .gateway
                .run(&self.tools.datalad_save(&message), root)
                .await
            {
                Ok(_) => LayerOutcome::Committed,
                Err(e) => {
                    warn!("Content-tracking save after restore failed: {}", e);
                    LayerOutcome::Failed { error: e.detail() }
                }
            }
        } else {
            LayerOutcome::NotApplicable
        };

        Ok(RestoreResult {
            path,
            revision: revision.to_string(),
            message,
            vcs,
            content_tracking,
        })
    }

    async fn check_preconditions(&self, root: &Path, path: &str, revision: &str) -> Result<()> {
        let commit = self
            .gateway
            .execute(
                &self.tools.git_commit_exists(revision),
                root,
                None,
                CheckMode::Lenient,
            )
            .await?;
        if !commit.success() {
            return Err(EngineError::RevisionNotFound {
                revision: revision.to_string(),
            });
        }

        let blob = self
            .gateway
            .execute(
                &self.tools.git_blob_exists(revision, path),
                root,
                None,
                CheckMode::Lenient,
            )
            .await?;
        if !blob.success() {
            return Err(EngineError::FileNotInRevision {
                path: path.to_string(),
                revision: revision.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
