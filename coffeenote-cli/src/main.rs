//! coffeenote - run the coffee drink notes HTTP API
//!
//! Loads `./.env`, reads flags and environment, then serves until shutdown.
//! A fatal database transport error exits non-zero so a process manager can
//! restart the service.

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod config;
mod tracing_setup;

use config::Cli;
use tracing_setup::TracingConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match dotenv {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Using environment variables only (no .env file found)"),
    }

    coffeenote_server::serve(cli.app_config()).await?;
    Ok(())
}
