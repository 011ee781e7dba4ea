//! Workflow graph synthesis.
//!
//! A dataset's stage directories become a star: one root node with a
//! `contains` edge to every stage. Stage nodes carry file counts and a color
//! derived from their tracking status, so the graph doubles as a status
//! overview. Synthesis is read-only and rebuilds the whole graph each call.

pub mod catalog;

pub use catalog::{StageCatalog, StageSpec, StageType, PLACEHOLDER_STAGES};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dataset::DatasetHandle;
use crate::error::Result;
use crate::status::{StatusClassification, StatusClassifier};
use catalog::{DELETED_COLOR, EDGE_COLOR, ROOT_COLOR, UNTRACKED_COLOR};

pub const ROOT_LABEL: &str = "Dataset Root";
pub const WORKFLOW_TYPE: &str = "spider_web_directory";
pub const CONTAINS: &str = "contains";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageNode {
    pub id: u32,
    pub label: String,
    #[serde(rename = "type")]
    pub stage_type: StageType,
    pub color: String,
    pub path: String,
    pub description: String,
    pub file_count: usize,
    pub tracked_files: usize,
    pub untracked_files: usize,
    pub deleted_files: usize,
    pub is_root: bool,
    /// Stage expected by the workflow but absent from the tree
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEdge {
    pub from: u32,
    pub to: u32,
    pub relation: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphMetadata {
    pub dataset_path: String,
    pub created_at: DateTime<Utc>,
    pub workflow_type: String,
    pub total_stages: usize,
    pub total_connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowGraph {
    pub nodes: Vec<StageNode>,
    pub edges: Vec<StageEdge>,
    pub metadata: GraphMetadata,
}

impl WorkflowGraph {
    pub fn root(&self) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.is_root)
    }

    /// Stage node whose label starts with `name`
    pub fn stage(&self, name: &str) -> Option<&StageNode> {
        self.nodes
            .iter()
            .filter(|n| !n.is_root)
            .find(|n| n.label.split('\n').next() == Some(name))
    }
}

/// Node label: name plus the non-zero counts, or `(0 files)`
pub fn stage_label(name: &str, file_count: usize, untracked: usize, deleted: usize) -> String {
    let parts: Vec<String> = [
        (file_count, "files"),
        (untracked, "untracked"),
        (deleted, "deleted"),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, what)| format!("{count} {what}"))
    .collect();

    if parts.is_empty() {
        format!("{name}\n(0 files)")
    } else {
        format!("{name}\n({})", parts.join(", "))
    }
}

/// Deleted files win over untracked ones; otherwise the stage keeps its base color
pub fn stage_color(base: &str, untracked: usize, deleted: usize) -> String {
    if deleted > 0 {
        DELETED_COLOR.to_string()
    } else if untracked > 0 {
        UNTRACKED_COLOR.to_string()
    } else {
        base.to_string()
    }
}

#[derive(Clone)]
pub struct WorkflowGraphSynthesizer {
    classifier: StatusClassifier,
    catalog: StageCatalog,
}

impl WorkflowGraphSynthesizer {
    pub fn new(classifier: StatusClassifier, catalog: StageCatalog) -> Self {
        Self {
            classifier,
            catalog,
        }
    }

    pub async fn synthesize(&self, dataset_path: impl AsRef<Path>) -> Result<WorkflowGraph> {
        let dataset = DatasetHandle::open(dataset_path)?;
        let mut nodes = vec![StageNode {
            id: 1,
            label: ROOT_LABEL.to_string(),
            stage_type: StageType::Root,
            color: ROOT_COLOR.to_string(),
            path: dataset.root().display().to_string(),
            description: "Root of the research dataset".to_string(),
            file_count: 0,
            tracked_files: 0,
            untracked_files: 0,
            deleted_files: 0,
            is_root: true,
            placeholder: false,
        }];

        let mut present = Vec::new();
        for (name, dir) in stage_directories(dataset.root()) {
            let Some(spec) = self.catalog.get(&name) else {
                continue;
            };
            let classification = self.classifier.classify(&dataset, &dir).await;
            let id = next_id(&nodes);
            nodes.push(stage_node(id, spec, &dir, &classification));
            present.push(name);
        }

        let expected: Vec<&StageSpec> = if present.is_empty() {
            self.catalog.builtin().collect()
        } else {
            PLACEHOLDER_STAGES
                .iter()
                .filter_map(|name| self.catalog.get(name))
                .collect()
        };
        for spec in expected {
            if present.contains(&spec.name) {
                continue;
            }
            let id = next_id(&nodes);
            nodes.push(placeholder_node(id, spec));
        }

        let edges: Vec<StageEdge> = nodes
            .iter()
            .filter(|n| !n.is_root)
            .map(|n| StageEdge {
                from: 1,
                to: n.id,
                relation: CONTAINS.to_string(),
                color: EDGE_COLOR.to_string(),
            })
            .collect();

        info!(
            "Synthesized workflow graph for {}: {} nodes, {} edges",
            dataset.root().display(),
            nodes.len(),
            edges.len()
        );

        Ok(WorkflowGraph {
            metadata: GraphMetadata {
                dataset_path: dataset.root().display().to_string(),
                created_at: Utc::now(),
                workflow_type: WORKFLOW_TYPE.to_string(),
                total_stages: nodes.len(),
                total_connections: edges.len(),
            },
            nodes,
            edges,
        })
    }
}

fn next_id(nodes: &[StageNode]) -> u32 {
    nodes.len() as u32 + 1
}

/// Immediate subdirectories of `root`, sorted by name
fn stage_directories(root: &Path) -> Vec<(String, std::path::PathBuf)> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            (name, entry.into_path())
        })
        .collect()
}

fn stage_node(id: u32, spec: &StageSpec, dir: &Path, status: &StatusClassification) -> StageNode {
    let tracked = status.tracked.len();
    let untracked = status.untracked.len();
    let deleted = status.deleted.len();
    let file_count = tracked + untracked;
    debug!(
        "Stage {}: {} files ({} untracked, {} deleted)",
        spec.name, file_count, untracked, deleted
    );

    StageNode {
        id,
        label: stage_label(&spec.name, file_count, untracked, deleted),
        stage_type: spec.stage_type,
        color: stage_color(spec.color, untracked, deleted),
        path: dir.display().to_string(),
        description: spec.description.clone(),
        file_count,
        tracked_files: tracked,
        untracked_files: untracked,
        deleted_files: deleted,
        is_root: false,
        placeholder: false,
    }
}

fn placeholder_node(id: u32, spec: &StageSpec) -> StageNode {
    StageNode {
        id,
        label: stage_label(&spec.name, 0, 0, 0),
        stage_type: spec.stage_type,
        color: spec.color.to_string(),
        path: format!("{}/", spec.name),
        description: spec.description.clone(),
        file_count: 0,
        tracked_files: 0,
        untracked_files: 0,
        deleted_files: 0,
        is_root: false,
        placeholder: true,
    }
}
