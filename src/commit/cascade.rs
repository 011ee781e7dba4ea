use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::dataset::{DatasetHandle, Tools};
use crate::status::parser;
use crate::subprocess::CommandGateway;

/// Save strategies in the order they are tried
pub const CASCADE: [SaveStrategy; 4] = [
    SaveStrategy::Recursive,
    SaveStrategy::Flat,
    SaveStrategy::PerSubunit,
    SaveStrategy::Forced,
];

pub const FORCED_COMMIT_PREFIX: &str = "Force save subdataset reference";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    Recursive,
    Flat,
    PerSubunit,
    Forced,
}

impl SaveStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Recursive => "Recursive save",
            Self::Flat => "Flat save",
            Self::PerSubunit => "Per-subunit save",
            Self::Forced => "Forced commit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded { log: Vec<String>, output: String },
    Failed { log: Vec<String> },
}

impl StageOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn log(&self) -> &[String] {
        match self {
            Self::Succeeded { log, .. } | Self::Failed { log } => log,
        }
    }
}

struct Attempt {
    entry: String,
    output: Option<String>,
}

/// Everything a strategy needs to run against one dataset
pub(crate) struct Cascade<'a> {
    pub gateway: &'a CommandGateway,
    pub tools: &'a Tools,
    pub dataset: &'a DatasetHandle,
    pub message: &'a str,
    /// Report from the initial status query, absent when that query failed
    pub status_report: Option<&'a str>,
}

impl Cascade<'_> {
    pub async fn run(&self, strategy: SaveStrategy) -> StageOutcome {
        match strategy {
            SaveStrategy::Recursive => {
                let argv = self.tools.datalad_save_recursive(self.message);
                self.single(strategy.label(), &argv).await
            }
            SaveStrategy::Flat => {
                let argv = self.tools.datalad_save(self.message);
                self.single(strategy.label(), &argv).await
            }
            SaveStrategy::PerSubunit => self.per_subunit().await,
            SaveStrategy::Forced => self.forced().await,
        }
    }

    async fn attempt(&self, label: &str, argv: &[String], dir: &Path) -> Attempt {
        match self.gateway.run(argv, dir).await {
            Ok(result) => {
                debug!("{} succeeded", label);
                Attempt {
                    entry: format!("{label}: SUCCESS"),
                    output: Some(result.stdout),
                }
            }
            Err(e) => {
                warn!("{} failed: {}", label, e);
                Attempt {
                    entry: format!("{label}: FAILED - {}", e.detail()),
                    output: None,
                }
            }
        }
    }

    async fn single(&self, label: &str, argv: &[String]) -> StageOutcome {
        let attempt = self.attempt(label, argv, self.dataset.root()).await;
        match attempt.output {
            Some(output) => StageOutcome::Succeeded {
                log: vec![attempt.entry],
                output,
            },
            None => StageOutcome::Failed {
                log: vec![attempt.entry],
            },
        }
    }

    async fn per_subunit(&self) -> StageOutcome {
        let label = SaveStrategy::PerSubunit.label();
        let units = self
            .status_report
            .map(parser::modified_datasets)
            .unwrap_or_default();
        if units.is_empty() {
            return StageOutcome::Failed {
                log: vec![format!(
                    "{label}: FAILED - no modified subdatasets in status report"
                )],
            };
        }

        let root = self.dataset.root();
        let mut log = Vec::new();
        for unit in &units {
            let unit_dir = self.dataset.join(unit);
            let inside = if unit_dir.is_dir() {
                let attempt = self
                    .attempt(
                        &format!("Subdataset save ({unit})"),
                        &self.tools.datalad_save(self.message),
                        &unit_dir,
                    )
                    .await;
                log.push(attempt.entry);
                attempt.output.is_some()
            } else {
                log.push(format!("Subdataset save ({unit}): FAILED - directory missing"));
                false
            };

            if !inside {
                let attempt = self
                    .attempt(
                        &format!("Subdataset save from parent ({unit})"),
                        &self.tools.datalad_save_path(self.message, unit),
                        root,
                    )
                    .await;
                log.push(attempt.entry);
            }
        }

        let retry = self
            .attempt("Flat save retry", &self.tools.datalad_save(self.message), root)
            .await;
        log.push(retry.entry);
        match retry.output {
            Some(output) => StageOutcome::Succeeded { log, output },
            None => StageOutcome::Failed { log },
        }
    }

    async fn forced(&self) -> StageOutcome {
        let label = SaveStrategy::Forced.label();
        let root = self.dataset.root();

        let report = match self.gateway.run(&self.tools.datalad_status(), root).await {
            Ok(result) => result.stdout,
            Err(e) => {
                return StageOutcome::Failed {
                    log: vec![format!("{label}: FAILED - status query: {}", e.detail())],
                }
            }
        };

        if report.trim().is_empty() {
            return StageOutcome::Succeeded {
                log: vec![format!("{label}: SUCCESS - nothing left to commit")],
                output: String::new(),
            };
        }

        let units = parser::modified_datasets(&report);
        if units.is_empty() {
            return StageOutcome::Failed {
                log: vec![format!(
                    "{label}: FAILED - no subdataset references to force"
                )],
            };
        }

        let commit_message = format!("{FORCED_COMMIT_PREFIX}: {}", self.message);
        let mut log = Vec::new();
        let mut output = String::new();
        for unit in &units {
            let add = self
                .attempt(&format!("Forced add ({unit})"), &self.tools.git_add(unit), root)
                .await;
            log.push(add.entry);
            if add.output.is_none() {
                return StageOutcome::Failed { log };
            }

            let commit = self
                .attempt(
                    &format!("{label} ({unit})"),
                    &self.tools.git_commit(&commit_message),
                    root,
                )
                .await;
            log.push(commit.entry);
            match commit.output {
                Some(out) => output = out,
                None => return StageOutcome::Failed { log },
            }
        }

        StageOutcome::Succeeded { log, output }
    }
}
