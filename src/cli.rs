//! Command-line surface.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::{ConfigLayer, SplitConfig};

#[derive(Debug, Parser)]
#[command(
    name = "propublica-splitter",
    version,
    about = "Split a Propublica Facebook ad export into message, entity, target and metadata tables"
)]
pub struct Cli {
    /// Propublica ad export (.csv)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination of each row's cleaned message text
    #[arg(long, value_name = "FILE")]
    pub messages: Option<PathBuf>,

    /// Destination of each row's entities
    #[arg(long, value_name = "FILE")]
    pub entities: Option<PathBuf>,

    /// Destination of each row's targeting criteria
    #[arg(long, value_name = "FILE")]
    pub targets: Option<PathBuf>,

    /// Destination of each row's metadata
    #[arg(long, value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    /// Also write cleaned messages as plain text
    #[arg(long, value_name = "FILE")]
    pub text: Option<PathBuf>,

    /// Directory for outputs not given explicitly
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Maximum number of rows to process; default: all
    #[arg(short = 'n', long = "numrows", value_name = "N")]
    pub numrows: Option<usize>,

    /// Rows between progress log lines (0 disables)
    #[arg(long, value_name = "N")]
    pub report_every: Option<usize>,

    /// JSON config file with default settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            out_dir: self.out_dir.clone(),
            messages: self.messages.clone(),
            entities: self.entities.clone(),
            targets: self.targets.clone(),
            metadata: self.metadata.clone(),
            text: self.text.clone(),
            limit: self.numrows,
            report_every: self.report_every,
        }
    }

    /// Resolve flags over `env` over the config file over defaults.
    pub fn into_config(self, env: ConfigLayer) -> Result<SplitConfig> {
        let file = match &self.config {
            Some(path) => ConfigLayer::load(path)?,
            None => ConfigLayer::default(),
        };
        let layer = self.layer().or(env).or(file);
        Ok(SplitConfig::resolve(self.input, layer))
    }
}
