//! Error types for generative backend calls
//!
//! A `ProviderError` describes one failed attempt. The router uses the
//! category to decide between retrying the same provider and moving on.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Connection issues, DNS failures, dropped streams
    #[error("Network error: {message}")]
    Network { message: String },

    /// Invalid API key, unauthorized access
    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        /// Wait requested by the backend
        retry_after: Option<Duration>,
    },

    /// Bad parameters or a prompt the backend refuses
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Request timeout after {} ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    /// Error reported by the backend service itself
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        /// Status or error code from the service
        code: Option<String>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl ProviderError {
    /// Failures worth another attempt on the same provider. Only auth,
    /// invalid-request, config and 4xx service errors stop immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Auth { .. }
            | ProviderError::InvalidRequest { .. }
            | ProviderError::Config { .. } => false,
            ProviderError::Provider { code, .. } => {
                !code.as_deref().is_some_and(|c| c.starts_with('4'))
            }
            ProviderError::Network { .. }
            | ProviderError::RateLimit { .. }
            | ProviderError::Timeout { .. }
            | ProviderError::Unknown { .. } => true,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ProviderError::Auth { .. })
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimit { .. })
    }

    /// Wait the backend asked for before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short category label for logs and failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network { .. } => "network",
            ProviderError::Auth { .. } => "auth",
            ProviderError::RateLimit { .. } => "rate_limit",
            ProviderError::InvalidRequest { .. } => "invalid_request",
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Provider { .. } => "provider",
            ProviderError::Config { .. } => "config",
            ProviderError::Unknown { .. } => "unknown",
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    pub fn provider(message: impl Into<String>, code: Option<impl Into<String>>) -> Self {
        Self::Provider {
            message: message.into(),
            code: code.map(|c| c.into()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
