//! Harness errors.

use teamsim_core::{ConfigError, SimError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to read or write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed parameter file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sim(#[from] SimError),
}

impl HarnessError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
