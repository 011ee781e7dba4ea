//! CLI argument structures

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::history::DEFAULT_HISTORY_LIMIT;

/// Save, restore and visualise versioned research datasets
#[derive(Parser, Debug)]
#[command(name = "scitrace")]
#[command(about = "scitrace - Versioned research datasets on top of DataLad and git", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for structured results
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify files as tracked, untracked or deleted
    Status {
        /// Dataset root
        path: PathBuf,

        /// Restrict to one stage directory and list its files
        #[arg(short, long)]
        stage: Option<String>,
    },

    /// Save every pending change in the dataset
    Commit {
        path: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Save the changes of a single stage directory
    #[command(name = "save-stage")]
    SaveStage {
        path: PathBuf,
        stage: String,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Restore one file to its content at a revision
    Restore {
        path: PathBuf,

        /// Dataset-relative file path
        file: String,

        /// Commit hash or other revision
        revision: String,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Build the workflow graph of the dataset
    Graph { path: PathBuf },

    /// Show commit history, newest first
    Log {
        path: PathBuf,

        /// Maximum number of commits
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,

        /// Only commits touching this file
        #[arg(long)]
        file: Option<String>,
    },

    /// List files changed by a commit
    Files { path: PathBuf, revision: String },

    /// Print a file as stored in a revision
    Show {
        path: PathBuf,
        revision: String,
        file: String,
    },

    /// Print the patch a revision applied to a file
    Diff {
        path: PathBuf,
        revision: String,
        file: String,
    },

    /// Print the checked-out branch
    Branch { path: PathBuf },

    /// Compare a revision with the local HEAD
    Compare { path: PathBuf, revision: String },

    /// Revert a commit
    Revert {
        path: PathBuf,
        revision: String,

        /// Replace the generated revert message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Switch to a revision, detached or on a new branch
    Checkout {
        path: PathBuf,
        revision: String,

        /// Create this branch at the revision instead of detaching HEAD
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Save a single file into the dataset
    Add {
        path: PathBuf,

        /// Dataset-relative path, or an absolute path to copy in
        file: String,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Run a shell command with recorded provenance
    Run {
        path: PathBuf,

        /// Command line, passed to datalad as one argument
        command: String,

        /// Input file the command reads (repeatable)
        #[arg(short, long = "input")]
        inputs: Vec<String>,

        /// Output file the command writes (repeatable)
        #[arg(short, long = "output")]
        outputs: Vec<String>,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the working-tree directory tree
    Tree { path: PathBuf },

    /// Create a new dataset with the standard stage layout
    Create {
        path: PathBuf,

        /// Display name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "general")]
        research_type: String,
    },

    /// Capture status views, optionally with a restore pre-flight check
    Diagnose {
        path: PathBuf,

        /// File to check for a restore (requires --revision)
        #[arg(long, requires = "revision")]
        file: Option<String>,

        #[arg(long, requires = "file")]
        revision: Option<String>,
    },

    /// Check that the content-tracking tool can be executed
    Probe,
}
