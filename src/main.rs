//! Propublica Splitter - splits a Facebook political-ad export into
//! message, entity, target and metadata tables keyed by ad id.

mod cleaner;
mod cli;
mod config;
mod entities;
mod error;
mod metadata;
mod reader;
mod record;
mod splitter;
mod targets;
mod writer;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use config::ConfigLayer;
use splitter::Splitter;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "propublica_splitter=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let env = ConfigLayer::from_env()?;
    let config = cli.into_config(env)?;

    let splitter = Splitter::new(config);
    let outputs = &splitter.config().outputs;
    info!(
        "Writing messages to {:?}, entities to {:?}, targets to {:?}, metadata to {:?}",
        outputs.messages, outputs.entities, outputs.targets, outputs.metadata
    );
    if let Some(text) = &outputs.text {
        info!("Writing plain-text messages to {:?}", text);
    }

    let stats = splitter
        .run()
        .with_context(|| format!("Failed to split {:?}", splitter.config().input))?;

    info!("Done: {} ad rows written", stats.rows_written);
    Ok(())
}
