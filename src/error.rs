//! # Error Types
//!
//! Custom error types for Elevator IO using `thiserror`.
//!
//! Only construction-time problems surface as errors. Per-cycle faults (a motor that stops
//! answering, an out-of-range voltage) are absorbed by the I/O layer and reported through
//! telemetry instead.

use thiserror::Error;

/// Main error type for Elevator IO
#[derive(Debug, Error)]
pub enum ElevatorError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sprocket or reduction values that would produce wrong unit conversions
    #[error("Invalid mechanism: {0}")]
    InvalidMechanism(String),

    /// Motor controller rejected its configuration
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Telemetry frame (de)serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// Recorded log cannot be replayed
    #[error("Replay error: {0}")]
    Replay(String),

    /// Robot mode that this binary cannot run
    #[error("Unsupported robot mode: {0}")]
    UnsupportedMode(String),
}

/// Result type alias for Elevator IO
pub type Result<T> = std::result::Result<T, ElevatorError>;
