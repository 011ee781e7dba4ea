//! # scitrace
//!
//! Versioned research dataset synchronization and workflow graph synthesis.
//!
//! The engine drives `datalad` (content tracking) on top of `git` to save,
//! restore and inspect research datasets, and derives a star-shaped workflow
//! graph from a dataset's stage directories.
//!
//! ## Usage
//!
//! ```bash
//! scitrace commit /data/soil-study -m "Add March samples"
//! scitrace restore /data/soil-study results/summary.csv 1a2b3c4
//! scitrace graph /data/soil-study --format yaml
//! ```
//!
//! ## Modules
//!
//! - `subprocess` - Command gateway: the only place external commands run
//! - `dataset` - Dataset handles, command shapes, creation, file operations and diagnostics
//! - `status` - Status report parsing and per-directory tracking classification
//! - `commit` - Cascading save strategy with an attempt log
//! - `restore` - Single-file restore with two persistence layers
//! - `history` - Commit history, per-commit file changes, revert
//! - `graph` - Workflow graph synthesis
//! - `config` - Engine configuration
//! - `error` - Error types and codes
pub mod cli;
pub mod commit;
pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod history;
pub mod restore;
pub mod status;
pub mod subprocess;

use commit::ChangeSetCommitter;
use config::EngineConfig;
use dataset::{DatasetCreator, DatasetDiagnostics, DatasetFiles, Tools};
use graph::{StageCatalog, WorkflowGraphSynthesizer};
use history::HistoryQueries;
use restore::FileRestorer;
use status::StatusClassifier;
use subprocess::CommandGateway;

/// Composition root: owns the shared gateway and hands out components.
///
/// Every component receives a clone of the same gateway, so a test that
/// builds the engine with a mock runner observes all external commands.
#[derive(Clone)]
pub struct Engine {
    gateway: CommandGateway,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let gateway = CommandGateway::production(config.command_timeout);
        Self { gateway, config }
    }

    pub fn with_gateway(gateway: CommandGateway, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    fn tools(&self) -> Tools {
        self.config.tools()
    }

    pub fn committer(&self) -> ChangeSetCommitter {
        ChangeSetCommitter::new(self.gateway.clone(), self.tools())
    }

    pub fn restorer(&self) -> FileRestorer {
        FileRestorer::new(self.gateway.clone(), self.tools())
    }

    pub fn classifier(&self) -> StatusClassifier {
        StatusClassifier::new(self.gateway.clone(), self.tools())
    }

    pub fn synthesizer(&self) -> WorkflowGraphSynthesizer {
        WorkflowGraphSynthesizer::new(
            self.classifier(),
            StageCatalog::with_extra(&self.config.extra_stages),
        )
    }

    pub fn history(&self) -> HistoryQueries {
        HistoryQueries::new(self.gateway.clone(), self.tools())
    }

    pub fn creator(&self) -> DatasetCreator {
        DatasetCreator::new(self.gateway.clone(), self.tools(), self.config.create_timeout)
    }

    pub fn files(&self) -> DatasetFiles {
        DatasetFiles::new(self.gateway.clone(), self.tools(), self.config.run_timeout)
    }

    pub fn diagnostics(&self) -> DatasetDiagnostics {
        DatasetDiagnostics::new(self.gateway.clone(), self.tools(), self.config.probe_timeout)
    }
}
