// src/infra/errors.rs — Error types for draftsmith

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolveError {
    // Input errors (fail fast, no iteration attempted)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rubric weights sum to {sum:.6}, expected 1.0")]
    RubricWeights { sum: f64 },

    #[error("Unknown merge strategy '{0}'")]
    UnknownMergeStrategy(String),

    #[error("Unknown variant strategy '{0}'")]
    UnknownStrategy(String),

    #[error("No variant strategies registered")]
    NoStrategies,

    // Oracle errors (recovered locally by the generator and judge)
    #[error("Oracle '{oracle}' failed: {message}")]
    Oracle {
        oracle: String,
        message: String,
        retriable: bool,
    },

    #[error("Oracle '{oracle}' timed out after {timeout_ms}ms")]
    OracleTimeout { oracle: String, timeout_ms: u64 },

    // Provider errors (surfaced through the LLM-backed oracles)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Merge failed: {0}")]
    Merge(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvolveError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            EvolveError::Oracle {
                retriable: true,
                ..
            } | EvolveError::Provider {
                retriable: true,
                ..
            } | EvolveError::RateLimited { .. }
                | EvolveError::OracleTimeout { .. }
        )
    }

    pub fn oracle(oracle: impl Into<String>, message: impl Into<String>) -> Self {
        EvolveError::Oracle {
            oracle: oracle.into(),
            message: message.into(),
            retriable: false,
        }
    }
}
