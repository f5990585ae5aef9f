//! Error types for the team model.

use teamsim_env::EnvError;
use thiserror::Error;

/// Invalid simulation parameters. Raised before a run starts, never during one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Fragment size must be strictly positive
    #[error("Fragment size must be positive, got {0}")]
    NonPositiveFragmentSize(f64),

    /// At least one coder is required
    #[error("At least one coder is required")]
    NoCoders,

    /// A time parameter is negative, zero where it must not be, or not finite
    #[error("Invalid time parameter {name}: {value}")]
    InvalidTime { name: &'static str, value: f64 },

    /// A probability outside [0, 1]
    #[error("Invalid probability {name}: {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    /// A distribution rejected its parameters
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Unknown parameter name in an override
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Override value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Kernel misuse
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// Bad parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Broken decomposition or completion accounting
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl SimError {
    /// Creates an invariant violation.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}
