//! Fatal error taxonomy for a split run.
//!
//! Row-local problems never surface here; they degrade in place and are
//! counted in [`crate::splitter::SplitStats`].

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type SplitResult<T> = Result<T, SplitError>;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("input header is missing required column '{0}'")]
    MissingColumn(String),
    #[error("invalid config: {0}")]
    Config(String),
}

impl SplitError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write(path: &Path, source: csv::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
