//! # Error Types
//!
//! Custom error types for ROV Link using `thiserror`.
//!
//! Wire-level decode failures live in [`crate::protocol::decoder::DecodeError`]
//! and never cross the session boundary as errors; they are folded into a
//! stale [`crate::link::session::TelemetryReading`] instead.

use thiserror::Error;

/// Main error type for ROV Link
#[derive(Debug, Error)]
pub enum RovLinkError {
    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an out-of-range value
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// Socket bind / send failures that prevent the session from running
    #[error("Transport error: {0}")]
    Transport(String),

    /// Input device errors (open, poll)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No joystick-like input device present
    #[error("No joystick found")]
    ControllerNotFound,

    /// Input mapping file could not be parsed
    #[error("Input mapping error: {0}")]
    Mapping(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ROV Link
pub type Result<T> = std::result::Result<T, RovLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message() {
        let err = RovLinkError::ConfigValidation("tick_rate_hz must be between 1 and 100".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: tick_rate_hz must be between 1 and 100"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RovLinkError = io.into();
        assert!(matches!(err, RovLinkError::Io(_)));
    }
}
