use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::commands::Tools;
use crate::error::{EngineError, Result};
use crate::subprocess::{CheckMode, CommandGateway};

/// Directories scaffolded into every new dataset
pub const SCAFFOLD_DIRS: [&str; 4] = ["raw_data", "scripts", "results", "plots"];

const GITIGNORE: &str = "\
# System files
.DS_Store
._*
Thumbs.db

# Python
__pycache__/
*.py[cod]
.ipynb_checkpoints
*.egg-info/
venv/
.venv/

# R
.Rhistory
.RData

# Editors
.vscode/
.idea/
*.swp
*~

# Temporary files
*.tmp
*.temp
*.log
";

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub path: PathBuf,
    pub name: Option<String>,
    pub research_type: String,
}

impl CreateRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            research_type: "general".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_research_type(mut self, research_type: impl Into<String>) -> Self {
        self.research_type = research_type.into();
        self
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string())
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedDataset {
    pub path: PathBuf,
    pub name: String,
    pub research_type: String,
    pub directories: Vec<String>,
    /// Whether the scaffolding was recorded by an initial save
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub output: String,
}

/// Creates new datasets with the standard research layout
#[derive(Clone)]
pub struct DatasetCreator {
    gateway: CommandGateway,
    tools: Tools,
    create_timeout: Duration,
}

impl DatasetCreator {
    pub fn new(gateway: CommandGateway, tools: Tools, create_timeout: Duration) -> Self {
        Self {
            gateway,
            tools,
            create_timeout,
        }
    }

    pub async fn create(&self, request: &CreateRequest) -> Result<CreatedDataset> {
        let path = &request.path;
        if path.exists() {
            return Err(EngineError::DatasetExists { path: path.clone() });
        }

        let name = request.display_name();
        info!("Creating dataset '{}' at {}", name, path.display());

        let working_dir = path
            .parent()
            .filter(|p| p.is_dir())
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let target = path.display().to_string();
        let result = self
            .gateway
            .execute(
                &self.tools.datalad_create(&target),
                &working_dir,
                Some(self.create_timeout),
                CheckMode::Strict,
            )
            .await?;

        if !path.join(".git").exists() {
            return Err(EngineError::dataset_invalid(
                path,
                "create finished but no .git directory was produced",
            ));
        }

        let directories = scaffold(path, &name, &request.research_type).await?;

        let message = format!(
            "Create empty structure for {} ({})",
            name, request.research_type
        );
        let (saved, warning) = match self
            .gateway
            .run(&self.tools.datalad_save(&message), path)
            .await
        {
            Ok(_) => (true, None),
            Err(e) => {
                warn!("Initial save of {} failed: {}", path.display(), e);
                (false, Some(format!("Could not save initial structure: {}", e.detail())))
            }
        };

        Ok(CreatedDataset {
            path: path.clone(),
            name,
            research_type: request.research_type.clone(),
            directories,
            saved,
            warning,
            output: result.stdout,
        })
    }
}

async fn scaffold(root: &Path, name: &str, research_type: &str) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for dir in SCAFFOLD_DIRS {
        tokio::fs::create_dir_all(root.join(dir)).await?;
        debug!("Created directory {}", dir);
        created.push(dir.to_string());
    }

    let readme = root.join("README.md");
    // annexed files show up as symlinks and must not be overwritten
    if tokio::fs::symlink_metadata(&readme)
        .await
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
    {
        debug!("README.md is annexed, leaving it alone");
    } else {
        tokio::fs::write(&readme, readme_text(name, research_type, root)).await?;
    }

    tokio::fs::write(root.join(".gitignore"), GITIGNORE).await?;
    Ok(created)
}

fn readme_text(name: &str, research_type: &str, root: &Path) -> String {
    let mut text = format!("# {name}\n\nResearch dataset ({research_type}).\n\n## Layout\n\n");
    for (dir, purpose) in SCAFFOLD_DIRS.iter().zip([
        "original, unmodified data",
        "analysis and processing code",
        "derived outputs",
        "figures and visualisations",
    ]) {
        text.push_str(&format!("- `{dir}/`: {purpose}\n"));
    }
    text.push_str(&format!(
        "\n## Working with the dataset\n\n```bash\ndatalad status\ndatalad save -m \"Describe the change\"\n```\n\nCreated {} at {}.\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        root.display()
    ));
    text
}
