//! Error types for snmprekey.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for snmprekey operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory loading errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Session layer errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Change engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Inventory loading errors. These are fatal to the whole run: a fleet
/// change must never start from a partially understood device list.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The inventory file could not be read
    #[error("Cannot read inventory '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A line did not have the expected field count
    #[error("Line {line}: expected 5 ':'-separated fields, found {found}")]
    MalformedLine { line: usize, found: usize },

    /// A line named a device family this tool does not speak
    #[error("Line {line}: unknown dialect '{token}'")]
    UnknownDialect { line: usize, token: String },
}

/// Session layer errors (connect, authenticate, command execution).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to reach the device at the transport level
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Credentials were rejected
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Operation did not complete within the bounded deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The device accepted the transport but rejected a command
    #[error("Device rejected '{command}': {detail}")]
    CommandRejected { command: String, detail: String },

    /// The channel closed while output was still expected
    #[error("Session closed by peer")]
    Closed,

    /// SSH protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Change engine errors. Each maps to exactly one terminal
/// [`Status`](crate::outcome::Status) at the device boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Privilege elevation was accepted transport-wise but the device
    /// never granted the elevated prompt
    #[error("Failed to enter privileged mode")]
    EscalationRejected,

    /// The run was cancelled before this device reached a terminal state
    #[error("Cancelled before completion")]
    Cancelled,

    /// A session operation failed mid-sequence
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type alias using snmprekey's Error.
pub type Result<T> = std::result::Result<T, Error>;
