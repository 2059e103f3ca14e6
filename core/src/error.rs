//! Error types for the core crate
//!
//! This module provides a consolidated error type for the core crate.
//! Variants follow the error taxonomy of the engine: validation failures,
//! resolution misses, dispatch failures and authorization failures, plus
//! the infrastructure errors raised while reading configuration or JSON.

use std::io;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// A parameter row or form failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced class, column, component or object could not be found
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// An operation call or save failed on the model client
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// The backend rejected the current session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A workflow was driven out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether this error means the session is no longer valid
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Unauthorized(_))
    }
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        match core_err {
            CoreError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }

        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let core_err: CoreError = json_err.into();
        match core_err {
            CoreError::Json(_) => {}
            _ => panic!("Expected Json variant"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::Validation("row 2 has no operation".to_string());
        assert_eq!(err.to_string(), "Validation error: row 2 has no operation");

        let err = CoreError::Unauthorized("token expired".to_string());
        assert_eq!(err.to_string(), "Unauthorized: token expired");
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(CoreError::Unauthorized("401".to_string()).is_unauthorized());
        assert!(!CoreError::Dispatch("500".to_string()).is_unauthorized());
    }
}
