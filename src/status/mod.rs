//! Tracking-status classification of dataset directories.
//!
//! [`StatusClassifier`] answers "which files below this directory are
//! tracked, untracked or deleted" by combining a filesystem walk with
//! per-file `git ls-files` checks and one `datalad status` report. Failures
//! of the external tools degrade to an empty classification so that callers
//! such as the graph synthesizer keep working.

pub mod parser;

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::dataset::{DatasetHandle, Tools};
use crate::error::{EngineError, Result};
use crate::subprocess::{CheckMode, CommandGateway, ProcessError};

const SKIPPED_NAMES: [&str; 3] = [".git", ".datalad", ".DS_Store"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Dataset-relative path
    pub path: String,
    pub display_name: String,
}

impl FileEntry {
    fn new(path: String) -> Self {
        let display_name = parser::display_name(&path);
        Self { path, display_name }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusClassification {
    pub tracked: Vec<FileEntry>,
    pub untracked: Vec<FileEntry>,
    pub deleted: Vec<FileEntry>,
}

impl StatusClassification {
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.untracked.is_empty() && self.deleted.is_empty()
    }

    /// Files present on disk
    pub fn present_count(&self) -> usize {
        self.tracked.len() + self.untracked.len()
    }

    pub fn is_tracked(&self, path: &str) -> bool {
        self.tracked.iter().any(|f| f.path == path)
    }
}

/// Regular files below `dir`, sorted by path, skipping VCS metadata
pub fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !SKIPPED_NAMES
                    .iter()
                    .any(|skip| entry.file_name() == std::ffi::OsStr::new(skip))
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[derive(Clone)]
pub struct StatusClassifier {
    gateway: CommandGateway,
    tools: Tools,
}

impl StatusClassifier {
    pub fn new(gateway: CommandGateway, tools: Tools) -> Self {
        Self { gateway, tools }
    }

    /// Classify the files under `directory` (absolute or dataset-relative).
    ///
    /// Never fails: an external command error yields an empty classification.
    pub async fn classify(&self, dataset: &DatasetHandle, directory: &Path) -> StatusClassification {
        match self.try_classify(dataset, directory).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(
                    "Could not classify {} in {}: {}",
                    directory.display(),
                    dataset.root().display(),
                    e
                );
                StatusClassification::default()
            }
        }
    }

    async fn try_classify(
        &self,
        dataset: &DatasetHandle,
        directory: &Path,
    ) -> std::result::Result<StatusClassification, ProcessError> {
        let absolute = if directory.is_absolute() {
            directory.to_path_buf()
        } else {
            dataset.join(directory)
        };
        let root = dataset.root();

        let mut tracked = Vec::new();
        let mut untracked = Vec::new();
        let mut present = HashSet::new();

        for file in candidate_files(&absolute) {
            let relative = dataset.relative_path(&file);
            let check = self
                .gateway
                .execute(
                    &self.tools.git_ls_files_error_unmatch(&relative),
                    root,
                    None,
                    CheckMode::Lenient,
                )
                .await?;
            present.insert(relative.clone());
            if check.success() {
                tracked.push(FileEntry::new(relative));
            } else {
                untracked.push(FileEntry::new(relative));
            }
        }

        let scope = dataset.relative_path(&absolute);
        let scope = if scope.is_empty() { ".".to_string() } else { scope };
        let report = self
            .gateway
            .execute(
                &self.tools.datalad_status_path(&scope),
                root,
                None,
                CheckMode::Strict,
            )
            .await?;

        let deleted: Vec<FileEntry> = parser::deleted_entries(&report.stdout)
            .into_iter()
            .filter(|entry| !present.contains(&entry.path))
            .map(|entry| FileEntry::new(entry.path))
            .collect();

        debug!(
            "Classified {}: {} tracked, {} untracked, {} deleted",
            scope,
            tracked.len(),
            untracked.len(),
            deleted.len()
        );

        Ok(StatusClassification {
            tracked,
            untracked,
            deleted,
        })
    }

    /// Per-file listing of one stage directory
    pub async fn inventory(&self, dataset_path: impl AsRef<Path>, stage: &str) -> Result<StageInventory> {
        let dataset = DatasetHandle::open(dataset_path)?;
        let stage_dir = dataset.join(stage);
        if !stage_dir.is_dir() {
            return Err(EngineError::StageNotFound { path: stage_dir });
        }

        let classification = self.classify(&dataset, &stage_dir).await;
        let mut files = Vec::new();
        for file in candidate_files(&stage_dir) {
            let relative = dataset.relative_path(&file);
            let size = tokio::fs::metadata(&file).await?.len();
            files.push(InventoryFile {
                name: parser::display_name(&relative),
                tracked: classification.is_tracked(&relative),
                path: relative,
                size,
            });
        }
        files.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));

        Ok(StageInventory {
            stage: stage.to_string(),
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            tracked_files: files.iter().filter(|f| f.tracked).count(),
            untracked_files: files.iter().filter(|f| !f.tracked).count(),
            deleted: classification.deleted,
            files,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub tracked: bool,
}

/// Files of one stage, largest first
#[derive(Debug, Clone, Serialize)]
pub struct StageInventory {
    pub stage: String,
    pub files: Vec<InventoryFile>,
    pub deleted: Vec<FileEntry>,
    pub total_files: usize,
    pub total_size: u64,
    pub tracked_files: usize,
    pub untracked_files: usize,
}
