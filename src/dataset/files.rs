//! File-level dataset operations: adding single files, provenance-tracked
//! command runs and the working-tree listing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::commands::Tools;
use super::{normalize_relative, DatasetHandle};
use crate::error::{EngineError, Result};
use crate::subprocess::{CheckMode, CommandGateway};

const TREE_SKIPPED_DIRS: [&str; 2] = [".git", ".datalad"];
const TREE_SKIPPED_FILES: [&str; 1] = [".DS_Store"];

// Output files named inline in a command, e.g. `> results/fit.csv`
static INLINE_OUTPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:results|outputs?|plots?)/[^\s]+\.(?:csv|txt|json|png|jpg|pdf)\b")
        .expect("output pattern is valid")
});

/// Output paths mentioned in `command` under the usual output directories
pub fn inline_outputs(command: &str) -> Vec<String> {
    INLINE_OUTPUT
        .find_iter(command)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedFile {
    /// Dataset-relative path that was saved
    pub path: String,
    pub message: String,
    /// Source of a file copied in from outside the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied_from: Option<PathBuf>,
    pub output: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub command: String,
    pub message: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl RunRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedRun {
    pub command: String,
    pub message: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// Annexed output symlinks removed so the command could overwrite them
    pub removed_links: Vec<String>,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Directory {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        path: String,
        size: u64,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. } | Self::File { name, .. } => name,
        }
    }
}

#[derive(Clone)]
pub struct DatasetFiles {
    gateway: CommandGateway,
    tools: Tools,
    run_timeout: Duration,
}

impl DatasetFiles {
    pub fn new(gateway: CommandGateway, tools: Tools, run_timeout: Duration) -> Self {
        Self {
            gateway,
            tools,
            run_timeout,
        }
    }

    /// Save one file into the dataset.
    ///
    /// A relative path must already exist inside the dataset. An absolute
    /// path outside the dataset is copied to the dataset root first.
    pub async fn add_file(
        &self,
        dataset_path: impl AsRef<Path>,
        file_path: &str,
        message: Option<&str>,
    ) -> Result<AddedFile> {
        let dataset = DatasetHandle::open(dataset_path)?;
        let source = Path::new(file_path.trim());

        let (relative, copied_from) = if source.is_absolute() && !source.starts_with(dataset.root()) {
            if !source.is_file() {
                return Err(EngineError::FileNotFound {
                    path: source.to_path_buf(),
                });
            }
            let Some(file_name) = source.file_name() else {
                return Err(EngineError::FileNotFound {
                    path: source.to_path_buf(),
                });
            };
            let destination = dataset.join(file_name);
            tokio::fs::copy(source, &destination).await?;
            debug!("Copied {} to {}", source.display(), destination.display());
            (dataset.relative_path(&destination), Some(source.to_path_buf()))
        } else {
            let relative = if source.is_absolute() {
                dataset.relative_path(source)
            } else {
                normalize_relative(file_path)
            };
            // Annexed files are symlinks whose target may not be present
            if tokio::fs::symlink_metadata(dataset.join(&relative)).await.is_err() {
                return Err(EngineError::FileNotFound {
                    path: dataset.join(&relative),
                });
            }
            (relative, None)
        };

        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Add file: {relative}"));

        info!("Saving {} into {}", relative, dataset.root().display());
        let result = self
            .gateway
            .run(&self.tools.datalad_save_path(&message, &relative), dataset.root())
            .await?;

        Ok(AddedFile {
            path: relative,
            message,
            copied_from,
            output: result.stdout,
        })
    }

    /// Run `request.command` under `datalad run` so its outputs carry provenance.
    ///
    /// Output files that are still annex symlinks are unlinked first, since
    /// the command could not write through them. Their removal is saved
    /// before the run; a failed save is logged and the run goes ahead.
    pub async fn run_tracked(
        &self,
        dataset_path: impl AsRef<Path>,
        request: &RunRequest,
    ) -> Result<TrackedRun> {
        let dataset = DatasetHandle::open(dataset_path)?;
        let root = dataset.root();
        let command = request.command.trim();
        if command.is_empty() {
            return Err(EngineError::Execution("Empty command".to_string()));
        }

        let candidates = if request.outputs.is_empty() {
            inline_outputs(command)
        } else {
            request.outputs.clone()
        };
        let removed_links = unlink_output_symlinks(&dataset, &candidates).await;

        if !removed_links.is_empty() {
            let message = format!(
                "Remove symbolic links for script execution: {}",
                removed_links.join(", ")
            );
            match self
                .gateway
                .execute(
                    &self.tools.datalad_save(&message),
                    root,
                    None,
                    CheckMode::Lenient,
                )
                .await
            {
                Ok(result) if result.success() => debug!("Saved removal of {:?}", removed_links),
                Ok(result) => warn!("Could not save removed links: {}", result.failure_text()),
                Err(e) => warn!("Could not save removed links: {}", e),
            }
        }

        let message = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Run command: {command}"));

        info!("Running tracked command in {}: {}", root.display(), command);
        let result = self
            .gateway
            .execute(
                &self
                    .tools
                    .datalad_run(&message, &request.inputs, &request.outputs, command),
                root,
                Some(self.run_timeout),
                CheckMode::Strict,
            )
            .await?;

        Ok(TrackedRun {
            command: command.to_string(),
            message,
            inputs: request.inputs.clone(),
            outputs: request.outputs.clone(),
            removed_links,
            output: result.stdout,
        })
    }

    /// Directory tree of the working copy, entries sorted by name
    pub fn file_tree(&self, dataset_path: impl AsRef<Path>) -> Result<Vec<TreeNode>> {
        let dataset = DatasetHandle::open_vcs(dataset_path)?;
        Ok(build_tree(&dataset, dataset.root()))
    }
}

async fn unlink_output_symlinks(dataset: &DatasetHandle, outputs: &[String]) -> Vec<String> {
    let mut removed = Vec::new();
    for output in outputs {
        let relative = normalize_relative(output);
        let path = dataset.join(&relative);
        let is_link = tokio::fs::symlink_metadata(&path)
            .await
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed output symlink {}", relative);
                removed.push(relative);
            }
            Err(e) => warn!("Could not remove {}: {}", relative, e),
        }
    }
    removed
}

fn build_tree(dataset: &DatasetHandle, dir: &Path) -> Vec<TreeNode> {
    let mut nodes = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = dataset.relative_path(entry.path());

        if entry.file_type().is_dir() {
            if TREE_SKIPPED_DIRS.contains(&name.as_str()) {
                continue;
            }
            nodes.push(TreeNode::Directory {
                name,
                path,
                children: build_tree(dataset, entry.path()),
            });
        } else {
            if TREE_SKIPPED_FILES.contains(&name.as_str()) {
                continue;
            }
            // Follows annex symlinks; a dangling link counts as empty
            let size = std::fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);
            nodes.push(TreeNode::File { name, path, size });
        }
    }
    nodes
}
