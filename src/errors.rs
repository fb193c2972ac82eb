//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the search and orchestration core, providing
//! structured error types shared by every component.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from search, caching, storage and generation
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Configuration, Search, Storage, Generation, Generic
//!
//! ## Key Features
//! - Transient/permanent classification driving the orchestrator's retry policy
//! - Automatic error conversion from underlying crates
//! - Category tags for structured logging

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, AssistError>;

/// Error types for the search and orchestration core
#[derive(Debug, Error)]
pub enum AssistError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid search query
    #[error("Invalid search query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    /// Key-value storage errors
    #[error("Storage error: {details}")]
    Storage { details: String },

    /// Serialization/deserialization errors
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// Network-level errors reaching the generation backend
    #[error("Network error: {details}")]
    Network { details: String },

    /// The generation backend asked us to slow down
    #[error("Generation backend rate limited the request")]
    RateLimited { retry_after_seconds: Option<u64> },

    /// The generation backend is temporarily unavailable
    #[error("Generation backend unavailable: {details}")]
    ServiceUnavailable { details: String },

    /// A gateway in front of the generation backend timed out
    #[error("Gateway timeout: {details}")]
    GatewayTimeout { details: String },

    /// The request itself was rejected as malformed
    #[error("Generation request rejected: {details}")]
    BadRequest { details: String },

    /// Credentials were missing or refused
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The backend refused the prompt on policy grounds
    #[error("Content rejected by generation backend: {details}")]
    ContentRejected { details: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AssistError {
    /// Check whether the error is transient and worth retrying with backoff.
    ///
    /// Only rate-limit, availability, timeout and network classes qualify;
    /// everything else propagates to the caller immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AssistError::Network { .. }
                | AssistError::RateLimited { .. }
                | AssistError::ServiceUnavailable { .. }
                | AssistError::GatewayTimeout { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            AssistError::Config { .. } => "configuration",
            AssistError::InvalidQuery { .. } => "search",
            AssistError::Storage { .. } | AssistError::Serialization { .. } => "storage",
            AssistError::Network { .. }
            | AssistError::RateLimited { .. }
            | AssistError::ServiceUnavailable { .. }
            | AssistError::GatewayTimeout { .. }
            | AssistError::BadRequest { .. }
            | AssistError::AuthenticationFailed { .. }
            | AssistError::ContentRejected { .. } => "generation",
            AssistError::Internal { .. } => "generic",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for AssistError {
    fn from(err: std::io::Error) -> Self {
        AssistError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for AssistError {
    fn from(err: serde_json::Error) -> Self {
        AssistError::Serialization {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<sled::Error> for AssistError {
    fn from(err: sled::Error) -> Self {
        AssistError::Storage {
            details: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AssistError {
    fn from(err: reqwest::Error) -> Self {
        AssistError::Network {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AssistError::RateLimited {
            retry_after_seconds: Some(5)
        }
        .is_transient());
        assert!(AssistError::ServiceUnavailable {
            details: "503".into()
        }
        .is_transient());
        assert!(AssistError::GatewayTimeout {
            details: "504".into()
        }
        .is_transient());
        assert!(!AssistError::BadRequest {
            details: "400".into()
        }
        .is_transient());
        assert!(!AssistError::AuthenticationFailed {
            reason: "bad key".into()
        }
        .is_transient());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            AssistError::Config {
                message: "x".into()
            }
            .category(),
            "configuration"
        );
        assert_eq!(
            AssistError::ContentRejected {
                details: "policy".into()
            }
            .category(),
            "generation"
        );
    }
}
