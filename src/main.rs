//! Spectra server binary
//!
//! Loads configuration from the environment, applies command-line overrides
//! and runs the HTTP service or one of the offline commands.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spectra::cli::{commands, Cli, Commands};
use spectra::config::ServiceConfig;
use spectra::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = ServiceConfig::from_env()?;
    cli.overrides.apply(&mut config);

    info!("Spectra v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => spectra::server::run_server(config).await,
        Commands::Equalize {
            input,
            output,
            bands,
        } => commands::equalize_file(&input, &output, &bands, config.max_bands),
        Commands::Sweep => commands::sweep(&config).map(|_| ()),
    }
}
