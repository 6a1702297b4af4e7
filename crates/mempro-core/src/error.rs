//! Error types for mempro-core.

use thiserror::Error;

/// Result type alias using mempro-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for record construction and storage
#[derive(Error, Debug)]
pub enum Error {
    // Construction errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Storage errors
    #[cfg(feature = "db")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store is closed")]
    StoreClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True if the error was raised before touching storage
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True for backend-level faults (I/O, connection, closed store)
    pub fn is_storage(&self) -> bool {
        !self.is_validation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::validation("confidence out of range");
        assert!(err.is_validation());
        assert!(!err.is_storage());
        assert!(err.to_string().contains("confidence"));

        let err = Error::StoreClosed;
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "Store is closed");
    }
}
