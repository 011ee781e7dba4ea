use serde::{Deserialize, Serialize};

pub const ROOT_COLOR: &str = "#4CAF50";
pub const DELETED_COLOR: &str = "#FF6B6B";
pub const UNTRACKED_COLOR: &str = "#FFA500";
pub const GENERIC_COLOR: &str = "#87CEEB";
pub const EDGE_COLOR: &str = "#666";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    Root,
    RawData,
    Preprocessed,
    Scripts,
    Results,
    Plots,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub stage_type: StageType,
    pub color: &'static str,
    pub description: String,
}

const BUILTIN: [(&str, StageType, &str, &str); 5] = [
    ("raw_data", StageType::RawData, "#87CEEB", "Raw data files"),
    ("preprocessed", StageType::Preprocessed, "#90EE90", "Preprocessed data files"),
    ("scripts", StageType::Scripts, "#4CAF50", "Analysis and processing scripts"),
    ("results", StageType::Results, "#FFA07A", "Final results and outputs"),
    ("plots", StageType::Plots, "#DDA0DD", "Generated visualizations"),
];

/// Output stages that always appear in a graph, as placeholders if absent
pub const PLACEHOLDER_STAGES: [&str; 2] = ["results", "plots"];

/// Directory names recognised as workflow stages
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<StageSpec>,
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self {
            stages: BUILTIN
                .into_iter()
                .map(|(name, stage_type, color, description)| StageSpec {
                    name: name.to_string(),
                    stage_type,
                    color,
                    description: description.to_string(),
                })
                .collect(),
        }
    }
}

impl StageCatalog {
    /// Built-in stages plus `extra` directory names as generic stages
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for name in extra {
            let name = name.as_ref().trim();
            if name.is_empty() || catalog.get(name).is_some() {
                continue;
            }
            catalog.stages.push(StageSpec {
                name: name.to_string(),
                stage_type: StageType::Generic,
                color: GENERIC_COLOR,
                description: format!("{name} directory"),
            });
        }
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Built-in stages in workflow order
    pub fn builtin(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages
            .iter()
            .filter(|s| s.stage_type != StageType::Generic)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
