//! Persisting working-tree changes.
//!
//! [`ChangeSetCommitter::commit_all`] walks an ordered cascade of save
//! strategies and stops at the first that succeeds. Every step lands in the
//! attempt log returned to the caller. When all strategies fail the commit is
//! reported as a degraded success with a warning rather than an error, since
//! the working tree is left intact and the caller can inspect the log.

mod cascade;

pub use cascade::{SaveStrategy, StageOutcome, CASCADE, FORCED_COMMIT_PREFIX};

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::dataset::{DatasetHandle, Tools};
use crate::error::{EngineError, Result};
use crate::subprocess::CommandGateway;
use cascade::Cascade;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Save all changes";
pub const NO_CHANGES_MESSAGE: &str = "No changes to save";

#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub committed: bool,
    pub degraded: bool,
    /// Strategy that persisted the changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SaveStrategy>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub attempts: Vec<String>,
    pub final_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_report: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSaveResult {
    pub stage: String,
    pub message: String,
    pub output: String,
}

#[derive(Clone)]
pub struct ChangeSetCommitter {
    gateway: CommandGateway,
    tools: Tools,
}

impl ChangeSetCommitter {
    pub fn new(gateway: CommandGateway, tools: Tools) -> Self {
        Self { gateway, tools }
    }

    /// Save every pending modification in the dataset.
    ///
    /// Only an invalid dataset is an error. A clean tree returns without
    /// issuing any write command.
    pub async fn commit_all(
        &self,
        dataset_path: impl AsRef<Path>,
        message: Option<&str>,
    ) -> Result<CommitOutcome> {
        let dataset = DatasetHandle::open(dataset_path)?;
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_COMMIT_MESSAGE);
        let mut attempts = Vec::new();

        let status_report = match self
            .gateway
            .run(&self.tools.datalad_status(), dataset.root())
            .await
        {
            Ok(result) if result.stdout_trimmed().is_empty() => {
                info!("{}: {}", dataset.root().display(), NO_CHANGES_MESSAGE);
                return Ok(CommitOutcome {
                    committed: true,
                    degraded: false,
                    strategy: None,
                    message: NO_CHANGES_MESSAGE.to_string(),
                    warning: None,
                    attempts,
                    final_output: String::new(),
                    status_report: Some(result.stdout),
                });
            }
            Ok(result) => Some(result.stdout),
            Err(e) => {
                warn!("Status query failed, continuing with the save cascade: {}", e);
                attempts.push(format!("Status query: FAILED - {}", e.detail()));
                None
            }
        };

        let cascade = Cascade {
            gateway: &self.gateway,
            tools: &self.tools,
            dataset: &dataset,
            message,
            status_report: status_report.as_deref(),
        };

        for strategy in CASCADE {
            info!("Trying {}", strategy.label().to_lowercase());
            match cascade.run(strategy).await {
                StageOutcome::Succeeded { log, output } => {
                    attempts.extend(log);
                    info!("Changes saved by {}", strategy.label().to_lowercase());
                    return Ok(CommitOutcome {
                        committed: true,
                        degraded: false,
                        strategy: Some(strategy),
                        message: format!("Changes saved ({})", strategy.label().to_lowercase()),
                        warning: None,
                        attempts,
                        final_output: output,
                        status_report,
                    });
                }
                StageOutcome::Failed { log } => attempts.extend(log),
            }
        }

        warn!(
            "Every save strategy failed for {}; reporting degraded success",
            dataset.root().display()
        );
        Ok(CommitOutcome {
            committed: true,
            degraded: true,
            strategy: None,
            message: "Save completed with warnings".to_string(),
            warning: Some(
                "No save strategy succeeded; some changes may remain uncommitted. Check the attempt log."
                    .to_string(),
            ),
            attempts,
            final_output: String::new(),
            status_report,
        })
    }

    /// Save the contents of a single stage directory
    pub async fn save_stage(
        &self,
        dataset_path: impl AsRef<Path>,
        stage: &str,
        message: Option<&str>,
    ) -> Result<StageSaveResult> {
        let dataset = DatasetHandle::open(dataset_path)?;
        let stage = crate::dataset::normalize_relative(stage);
        let stage_dir = dataset.join(&stage);
        if stage.is_empty() || !stage_dir.is_dir() {
            return Err(EngineError::StageNotFound { path: stage_dir });
        }

        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Save stage changes: {stage}"));

        let result = self
            .gateway
            .run(&self.tools.datalad_save_path(&message, &stage), dataset.root())
            .await?;

        info!("Saved stage {} in {}", stage, dataset.root().display());
        Ok(StageSaveResult {
            stage,
            message,
            output: result.stdout,
        })
    }
}

#[cfg(test)]
mod tests;
