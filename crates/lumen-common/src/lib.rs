//! # Lumen Common
//!
//! Common utilities, error types, and logging configuration for the Lumen
//! offline worker.
//!
//! ## Features
//!
//! - Unified error type with category tags and retryability
//! - Logging configuration and setup
//! - Retry and timeout utilities for network-facing paths
//! - Result extension traits

use std::time::Duration;
use thiserror::Error;

pub mod logging;
pub mod retry;

pub use logging::{init_logging, LogConfig, LogFormat};
pub use retry::{retry_with_backoff, with_timeout, RetryConfig};

/// Unified error type for Lumen.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Cache store errors (open, read, write, purge).
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network-related errors.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Worker lifecycle errors (install, activate, takeover).
    #[error("Lifecycle error: {message}")]
    Lifecycle {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Background sync errors.
    #[error("Sync error: {message}")]
    Sync {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors.
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout errors.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Cancelled operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        backtrace: Option<backtrace::Backtrace>,
    },
}

impl LumenError {
    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with source.
    pub fn store_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a lifecycle error.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
            source: None,
        }
    }

    /// Create a sync error.
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with backtrace.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LumenError::Network { .. } | LumenError::Timeout(_) | LumenError::Io(_)
        )
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            LumenError::Store { .. } => "store",
            LumenError::Network { .. } => "network",
            LumenError::Lifecycle { .. } => "lifecycle",
            LumenError::Sync { .. } => "sync",
            LumenError::Config { .. } => "config",
            LumenError::Io(_) => "io",
            LumenError::Timeout(_) => "timeout",
            LumenError::Cancelled => "cancelled",
            LumenError::NotFound(_) => "not_found",
            LumenError::InvalidArgument(_) => "invalid_argument",
            LumenError::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for Lumen operations.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Extension trait for Result.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| LumenError::Internal {
            message: format!("{}: {}", message.into(), e),
            backtrace: Some(backtrace::Backtrace::new()),
        })
    }
}

/// Extension trait for Option.
pub trait OptionExt<T> {
    /// Convert None to a NotFound error.
    fn ok_or_not_found(self, resource: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, resource: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| LumenError::NotFound(resource.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(LumenError::store("test").category(), "store");
        assert_eq!(LumenError::network("test").category(), "network");
        assert_eq!(LumenError::lifecycle("test").category(), "lifecycle");
        assert_eq!(
            LumenError::Timeout(Duration::from_secs(1)).category(),
            "timeout"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(LumenError::network("test").is_retryable());
        assert!(LumenError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!LumenError::store("test").is_retryable());
        assert!(!LumenError::Cancelled.is_retryable());
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(7);
        assert_eq!(some.ok_or_not_found("test").unwrap(), 7);

        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_not_found("test"),
            Err(LumenError::NotFound(_))
        ));
    }
}
