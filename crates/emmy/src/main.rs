//! `Emmy` - AI email assistant for Gmail
//!
//! Authorize a Gmail account once, draft emails from a short instruction
//! with Gemini, and send them (with an optional attachment) either from the
//! command line or through the local HTTP API.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod api;
mod cli;
mod config;
mod state;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emmy=info,emmy_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load_from_env()?;
    info!(database = %config.database_path.display(), "starting Emmy");

    cli.command.run(config).await
}
