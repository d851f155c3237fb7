//! Run configuration.
//!
//! Settings are layered, highest first: command-line flags, environment
//! (`SPLITTER_*`, with `.env` loaded at startup), an optional JSON config
//! file, then built-in defaults. Each layer is a [`ConfigLayer`] of optional
//! values; [`SplitConfig::resolve`] fills the gaps with defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{SplitError, SplitResult};

pub const DEFAULT_MESSAGES_FILE: &str = "propub_messages.csv";
pub const DEFAULT_ENTITIES_FILE: &str = "propub_entities.csv";
pub const DEFAULT_TARGETS_FILE: &str = "propub_targets.csv";
pub const DEFAULT_METADATA_FILE: &str = "propub_metadata.csv";

/// Rows between progress log lines.
pub const DEFAULT_REPORT_EVERY: usize = 10_000;

const ENV_OUT_DIR: &str = "SPLITTER_OUT_DIR";
const ENV_REPORT_EVERY: &str = "SPLITTER_REPORT_EVERY";

/// Destinations of the split outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub messages: PathBuf,
    pub entities: PathBuf,
    pub targets: PathBuf,
    pub metadata: PathBuf,
    /// Optional plain-text dump of the cleaned messages.
    pub text: Option<PathBuf>,
}

impl OutputPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            messages: dir.join(DEFAULT_MESSAGES_FILE),
            entities: dir.join(DEFAULT_ENTITIES_FILE),
            targets: dir.join(DEFAULT_TARGETS_FILE),
            metadata: dir.join(DEFAULT_METADATA_FILE),
            text: None,
        }
    }

    fn all(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.messages, &self.entities, &self.targets, &self.metadata]
            .into_iter()
            .chain(self.text.iter())
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub input: PathBuf,
    pub outputs: OutputPaths,
    /// Stop after this many input rows have been consumed.
    pub limit: Option<usize>,
    /// 0 disables progress logging.
    pub report_every: usize,
}

impl SplitConfig {
    /// Defaults for `input`, writing into the current directory.
    #[cfg(test)]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self::resolve(input.into(), ConfigLayer::default())
    }

    /// Apply a merged layer on top of the defaults.
    pub fn resolve(input: PathBuf, layer: ConfigLayer) -> Self {
        let dir = layer.out_dir.unwrap_or_else(|| PathBuf::from("."));
        let defaults = OutputPaths::in_dir(&dir);
        Self {
            input,
            outputs: OutputPaths {
                messages: layer.messages.unwrap_or(defaults.messages),
                entities: layer.entities.unwrap_or(defaults.entities),
                targets: layer.targets.unwrap_or(defaults.targets),
                metadata: layer.metadata.unwrap_or(defaults.metadata),
                text: layer.text,
            },
            limit: layer.limit,
            report_every: layer.report_every.unwrap_or(DEFAULT_REPORT_EVERY),
        }
    }

    /// Reject configurations that would clobber the input or write two
    /// outputs to the same file.
    pub fn validate(&self) -> SplitResult<()> {
        let mut seen = HashSet::new();
        for path in self.outputs.all() {
            if path == &self.input {
                return Err(SplitError::config(format!(
                    "output {:?} would overwrite the input file",
                    path
                )));
            }
            if !seen.insert(path) {
                return Err(SplitError::config(format!(
                    "output {:?} is used for more than one table",
                    path
                )));
            }
        }
        Ok(())
    }
}

/// One source of optional settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub out_dir: Option<PathBuf>,
    pub messages: Option<PathBuf>,
    pub entities: Option<PathBuf>,
    pub targets: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub limit: Option<usize>,
    pub report_every: Option<usize>,
}

impl ConfigLayer {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let layer: ConfigLayer = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(layer)
    }

    /// Read `SPLITTER_OUT_DIR` and `SPLITTER_REPORT_EVERY` from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let report_every = match var(ENV_REPORT_EVERY) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("{} must be a non-negative integer", ENV_REPORT_EVERY))?,
            ),
            None => None,
        };
        Ok(Self {
            out_dir: var(ENV_OUT_DIR).filter(|v| !v.trim().is_empty()).map(PathBuf::from),
            report_every,
            ..Default::default()
        })
    }

    /// Fill every unset value of `self` from `lower`.
    pub fn or(self, lower: ConfigLayer) -> Self {
        Self {
            out_dir: self.out_dir.or(lower.out_dir),
            messages: self.messages.or(lower.messages),
            entities: self.entities.or(lower.entities),
            targets: self.targets.or(lower.targets),
            metadata: self.metadata.or(lower.metadata),
            text: self.text.or(lower.text),
            limit: self.limit.or(lower.limit),
            report_every: self.report_every.or(lower.report_every),
        }
    }
}
