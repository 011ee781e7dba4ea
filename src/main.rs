use clap::Parser;
use tracing::{debug, error, trace};

use scitrace::cli::{execute_command, Cli};
use scitrace::config::EngineConfig;
use scitrace::error::EngineError;
use scitrace::Engine;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let log_level = match cli.verbose {
        0 => config.log_level.clone().unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    // Results go to stdout, diagnostics to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .with_writer(std::io::stderr)
        .init();

    debug!("scitrace started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    trace!("Effective configuration: {:?}", config);

    let engine = Engine::new(config);
    if let Err(e) = execute_command(cli.command, cli.format, &engine).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e}");
        let code = e
            .downcast_ref::<EngineError>()
            .map(EngineError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
