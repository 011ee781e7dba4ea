//! Command routing and execution
//!
//! Maps each parsed subcommand onto one engine operation and prints its
//! structured result.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::args::{Commands, OutputFormat};
use super::output::emit;
use crate::dataset::{CreateRequest, DatasetHandle, RunRequest};
use crate::history::CommitRecord;
use crate::Engine;

#[derive(Serialize)]
struct LogEntry {
    #[serde(flatten)]
    record: CommitRecord,
    relative_age: String,
    absolute_age: String,
}

impl From<CommitRecord> for LogEntry {
    fn from(record: CommitRecord) -> Self {
        Self {
            relative_age: record.relative_age(),
            absolute_age: record.absolute_age(),
            record,
        }
    }
}

#[derive(Serialize)]
struct BranchView<'a> {
    dataset: &'a Path,
    branch: String,
}

/// Execute a CLI command against `engine`
pub async fn execute_command(command: Commands, format: OutputFormat, engine: &Engine) -> Result<()> {
    match command {
        Commands::Status { path, stage } => match stage {
            Some(stage) => {
                let inventory = engine.classifier().inventory(&path, &stage).await?;
                emit(&inventory, format)
            }
            None => {
                let dataset = DatasetHandle::open(&path)?;
                let classification = engine.classifier().classify(&dataset, dataset.root()).await;
                emit(&classification, format)
            }
        },
        Commands::Commit { path, message } => {
            let outcome = engine
                .committer()
                .commit_all(&path, message.as_deref())
                .await?;
            if let Some(ref warning) = outcome.warning {
                warn!("{}", warning);
            }
            emit(&outcome, format)
        }
        Commands::SaveStage {
            path,
            stage,
            message,
        } => {
            let saved = engine
                .committer()
                .save_stage(&path, &stage, message.as_deref())
                .await?;
            emit(&saved, format)
        }
        Commands::Restore {
            path,
            file,
            revision,
            message,
        } => {
            let result = engine
                .restorer()
                .restore(&path, &file, &revision, message.as_deref())
                .await?;
            emit(&result, format)
        }
        Commands::Graph { path } => {
            let graph = engine.synthesizer().synthesize(&path).await?;
            emit(&graph, format)
        }
        Commands::Log { path, limit, file } => {
            let history = engine.history();
            let records = match file {
                Some(file) => history.file_history(&path, &file, limit).await?,
                None => history.commit_history(&path, limit).await?,
            };
            let entries: Vec<LogEntry> = records.into_iter().map(LogEntry::from).collect();
            emit(&entries, format)
        }
        Commands::Files { path, revision } => {
            let changes = engine.history().commit_files(&path, &revision).await?;
            emit(&changes, format)
        }
        Commands::Show {
            path,
            revision,
            file,
        } => {
            let content = engine
                .history()
                .file_content(&path, &revision, &file)
                .await?;
            print!("{content}");
            Ok(())
        }
        Commands::Diff {
            path,
            revision,
            file,
        } => {
            let diff = engine.history().file_diff(&path, &revision, &file).await?;
            print!("{diff}");
            Ok(())
        }
        Commands::Branch { path } => {
            let branch = engine.history().current_branch(&path).await?;
            emit(
                &BranchView {
                    dataset: &path,
                    branch,
                },
                format,
            )
        }
        Commands::Compare { path, revision } => {
            let comparison = engine.history().compare_to_local(&path, &revision).await?;
            emit(&comparison, format)
        }
        Commands::Revert {
            path,
            revision,
            message,
        } => {
            let result = engine
                .history()
                .revert(&path, &revision, message.as_deref())
                .await?;
            emit(&result, format)
        }
        Commands::Checkout {
            path,
            revision,
            branch,
        } => {
            let history = engine.history();
            let result = match branch {
                Some(branch) => history.create_branch(&path, &revision, &branch).await?,
                None => history.checkout_commit(&path, &revision).await?,
            };
            emit(&result, format)
        }
        Commands::Add {
            path,
            file,
            message,
        } => {
            let added = engine
                .files()
                .add_file(&path, &file, message.as_deref())
                .await?;
            emit(&added, format)
        }
        Commands::Run {
            path,
            command,
            inputs,
            outputs,
            message,
        } => {
            let request = RunRequest {
                command,
                message,
                inputs,
                outputs,
            };
            let run = engine.files().run_tracked(&path, &request).await?;
            emit(&run, format)
        }
        Commands::Tree { path } => {
            let tree = engine.files().file_tree(&path)?;
            emit(&tree, format)
        }
        Commands::Create {
            path,
            name,
            research_type,
        } => {
            let mut request = CreateRequest::new(path).with_research_type(research_type);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            let created = engine.creator().create(&request).await?;
            emit(&created, format)
        }
        Commands::Diagnose {
            path,
            file,
            revision,
        } => {
            let diagnostics = engine.diagnostics();
            match (file, revision) {
                (Some(file), Some(revision)) => {
                    let report = diagnostics.restore_preflight(&path, &file, &revision).await;
                    emit(&report, format)
                }
                _ => {
                    let snapshot = diagnostics.snapshot(&path).await?;
                    emit(&snapshot, format)
                }
            }
        }
        Commands::Probe => {
            let probe = engine.diagnostics().probe().await;
            let available = probe.available;
            emit(&probe, format)?;
            if !available {
                anyhow::bail!("{} is not available", engine.config().datalad_binary);
            }
            Ok(())
        }
    }
}
