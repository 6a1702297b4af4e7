//! SDK Error Types
//!
//! Defines error types for the memPro SDK.

use mempro_core::MemoryLevel;
use thiserror::Error;

/// SDK Result type alias
pub type SDKResult<T> = Result<T, SDKError>;

fn level_label(level: &Option<MemoryLevel>) -> &'static str {
    level.map(|l| l.as_str()).unwrap_or("store")
}

/// SDK errors
#[derive(Debug, Error)]
pub enum SDKError {
    /// Input rejected before any storage write
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Backend fault, tagged with the layer that failed when known
    #[error("storage error ({}): {source}", level_label(.level))]
    Storage {
        level: Option<MemoryLevel>,
        source: mempro_core::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Invalid operation
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SDKError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a storage error for a given layer
    pub fn storage(level: MemoryLevel, source: mempro_core::Error) -> Self {
        Self::Storage {
            level: Some(level),
            source,
        }
    }

    /// Classify a core error raised while working on `level`
    pub fn at_level(source: mempro_core::Error, level: MemoryLevel) -> Self {
        match source {
            mempro_core::Error::Validation(message) => Self::Validation { message },
            source => Self::storage(level, source),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Check if this error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error is a storage error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Check if this error is an invalid operation error
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation { .. })
    }

    /// The layer a storage error is attributed to
    pub fn level(&self) -> Option<MemoryLevel> {
        match self {
            Self::Storage { level, .. } => *level,
            _ => None,
        }
    }
}

impl From<mempro_core::Error> for SDKError {
    fn from(source: mempro_core::Error) -> Self {
        match source {
            mempro_core::Error::Validation(message) => Self::Validation { message },
            source => Self::Storage {
                level: None,
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SDKError::validation("content must not be empty");
        assert!(err.is_validation());
        assert!(err.to_string().contains("content"));

        let err = SDKError::invalid_operation("unknown tool: memory_forget");
        assert!(err.is_invalid_operation());
        assert!(err.to_string().contains("memory_forget"));
    }

    #[test]
    fn test_core_error_mapping() {
        let err: SDKError = mempro_core::Error::validation("bad confidence").into();
        assert!(err.is_validation());

        let err: SDKError = mempro_core::Error::StoreClosed.into();
        assert!(err.is_storage());
        assert_eq!(err.level(), None);
        assert!(err.to_string().contains("store"));

        let err = SDKError::at_level(mempro_core::Error::StoreClosed, MemoryLevel::Episode);
        assert_eq!(err.level(), Some(MemoryLevel::Episode));
        assert!(err.to_string().contains("episode"));

        let err = SDKError::at_level(mempro_core::Error::validation("x"), MemoryLevel::Theme);
        assert!(err.is_validation());
    }
}
