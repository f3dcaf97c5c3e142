//! Centralized error types and conversions for biomind
//!
//! Library code returns `BioMindError`. The CLI and the config loader use
//! `anyhow` for context on top of it.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error type for biomind operations
#[derive(Error, Debug)]
pub enum BioMindError {
    /// IO errors with path context
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid user input (bad sequence, unknown organism, empty query)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Unknown tier name requested by a caller
    #[error("Unknown tier: {tier}")]
    UnknownTier { tier: String },

    /// External collaborator errors (search, usage accounting)
    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl BioMindError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown tier error
    pub fn unknown_tier(tier: impl Into<String>) -> Self {
        Self::UnknownTier { tier: tier.into() }
    }

    /// Create an external service error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns true if the caller can continue after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            BioMindError::Io { .. } => true,
            BioMindError::InvalidInput { .. } => true,
            BioMindError::ExternalService { .. } => true,
            BioMindError::UnknownTier { .. } => true,
            // Bad config or corrupt data need operator intervention
            BioMindError::Config { .. } => false,
            BioMindError::Serialization { .. } => false,
        }
    }

    /// Returns the log level this error should be reported at
    pub fn severity(&self) -> tracing::Level {
        match self {
            BioMindError::Config { .. } => tracing::Level::ERROR,
            BioMindError::Serialization { .. } => tracing::Level::ERROR,
            BioMindError::Io { .. } => tracing::Level::WARN,
            BioMindError::ExternalService { .. } => tracing::Level::WARN,
            BioMindError::UnknownTier { .. } => tracing::Level::WARN,
            BioMindError::InvalidInput { .. } => tracing::Level::INFO,
        }
    }

    /// Returns a hint for the operator, when one applies
    pub fn suggestion(&self) -> Option<String> {
        match self {
            BioMindError::Config { .. } => {
                Some("Check your config.json file or BIOMIND_* environment variables.".to_string())
            }
            BioMindError::UnknownTier { .. } => {
                Some("Run 'biomind tiers' to list the configured tiers.".to_string())
            }
            BioMindError::InvalidInput { message } if message.contains("sequence") => {
                Some("Sequences may only contain IUPAC nucleotide letters.".to_string())
            }
            _ => None,
        }
    }
}

/// Result type alias using BioMindError
pub type Result<T> = std::result::Result<T, BioMindError>;

impl From<std::io::Error> for BioMindError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for BioMindError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
