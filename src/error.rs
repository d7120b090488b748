//! Error types for zone counting.

use thiserror::Error;

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, ZoneError>;

/// Errors that stop a counting session before any frame is processed.
#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZoneError {
    pub fn polygon<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPolygon(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Failures reported by an event sink. These never abort frame processing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink rejected the write: {0}")]
    Rejected(String),

    #[error("Sink is disconnected")]
    Disconnected,

    #[error("Sink queue is full")]
    QueueFull,
}
