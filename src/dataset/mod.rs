//! Dataset handles and dataset-level utilities.
//!
//! A dataset is a directory under `git` control that also carries `datalad`
//! metadata (`.datalad/`). Handles are built per operation from a caller path
//! and never cached, so each operation sees the directory as it is right now.

pub mod commands;
pub mod create;
pub mod diagnostics;
pub mod files;

pub use commands::Tools;
pub use create::{CreateRequest, CreatedDataset, DatasetCreator};
pub use diagnostics::{DatasetDiagnostics, Probe, RestorePreflight, StatusSnapshot};
pub use files::{AddedFile, DatasetFiles, RunRequest, TrackedRun, TreeNode};

use std::path::{Component, Path, PathBuf};

use crate::error::{EngineError, Result};

const VCS_DIR: &str = ".git";
const CONTENT_TRACKING_DIR: &str = ".datalad";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    root: PathBuf,
}

impl DatasetHandle {
    /// Open a fully initialised dataset (`.git` and `.datalad` present)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let handle = Self::open_vcs(path)?;
        if !handle.is_content_tracked() {
            return Err(EngineError::dataset_invalid(
                &handle.root,
                "missing .datalad directory",
            ));
        }
        Ok(handle)
    }

    /// Open a directory that only needs to be a `git` working tree
    pub fn open_vcs(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(EngineError::dataset_invalid(root, "directory does not exist"));
        }
        if !root.join(VCS_DIR).exists() {
            return Err(EngineError::dataset_invalid(root, "missing .git directory"));
        }
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn is_content_tracked(&self) -> bool {
        self.root.join(CONTENT_TRACKING_DIR).is_dir()
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Dataset-relative, `/`-separated form of `path`.
    ///
    /// Absolute paths outside the dataset are returned unchanged.
    pub fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::CurDir => None,
                other => Some(other.as_os_str().to_string_lossy().into_owned()),
            })
            .collect();
        if relative.is_absolute() {
            relative.display().to_string()
        } else {
            parts.join("/")
        }
    }
}

/// Normalise a caller-supplied dataset-relative file path
pub fn normalize_relative(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}
