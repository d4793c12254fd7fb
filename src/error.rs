//! Error types for doorwatch.
//!
//! All errors are strongly typed using thiserror. Nothing on the data path is
//! fatal: extraction and sink failures are reported through these types so
//! they can be logged, but they never reach the presence state machine.

use thiserror::Error;

/// Validation errors raised while checking configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
    },

    #[error("Failed to read configuration file {path}: {message}")]
    ConfigRead {
        path: String,
        message: String,
    },
}

/// Execution errors raised by the runtime's channels and workers.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Channel '{path}' is disconnected")]
    Disconnected {
        path: String,
    },

    #[error("Queue '{path}' is full (capacity {capacity})")]
    QueueFull {
        path: String,
        capacity: usize,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Failed to spawn worker '{name}': {message}")]
    Spawn {
        name: String,
        message: String,
    },
}

/// Failures reported by injected capabilities (alert, notification, stores).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Alert sound failed: {message}")]
    Alert {
        message: String,
    },

    #[error("Notification failed: {message}")]
    Notification {
        message: String,
    },

    #[error("Record store write failed: {message}")]
    Store {
        message: String,
    },

    #[error("Remote log request failed: {message}")]
    Remote {
        message: String,
    },

    #[error("Remote log rejected with HTTP status {status}")]
    RemoteStatus {
        status: u16,
    },

    #[error("Remote log endpoint is not configured")]
    NotConfigured,
}

/// A matched tag whose digit run could not be represented.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Numeric overflow in '{field}' field ({digits} digits)")]
    NumericOverflow {
        field: &'static str,
        digits: usize,
    },
}

/// Top-level error type for doorwatch.
#[derive(Debug, Error)]
pub enum DoorwatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl DoorwatchError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a sink error.
    #[must_use]
    pub const fn is_sink(&self) -> bool {
        matches!(self, Self::Sink(_))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(e, ExecutionError::Timeout { .. } | ExecutionError::QueueFull { .. }),
            Self::Sink(e) => match e {
                SinkError::Remote { .. } => true,
                SinkError::RemoteStatus { status } => *status >= 500,
                _ => false,
            },
        }
    }
}

/// Result type alias for doorwatch operations.
pub type DoorwatchResult<T> = Result<T, DoorwatchError>;
