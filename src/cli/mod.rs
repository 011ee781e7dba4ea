//! Command-line interface for the dataset engine.

pub mod args;
pub mod output;
pub mod router;

pub use args::{Cli, Commands, OutputFormat};
pub use router::execute_command;
