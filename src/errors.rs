/*!
 * Error types for the sitecraft library.
 *
 * This module contains custom error types for the collaborators the lifecycle
 * orchestrator talks to, using the thiserror crate for ergonomic error definitions.
 * None of these errors are fatal: the orchestrator turns every one of them into a
 * user notification plus an optional error continuation.
 */

use thiserror::Error;

/// Errors that can occur when the document store opens or parses a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The requested file or template does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The storage service could not be reached
    #[error("Storage service {service} is unreachable: {message}")]
    Unreachable {
        /// Service label of the storage provider
        service: String,
        /// Error message from the storage layer
        message: String,
    },

    /// The markup could not be loaded as a document
    #[error("Failed to parse document: {0}")]
    Parse(String),

    /// Low level read or write failure
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors reported by the file picker or the template dialog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PickerError {
    /// The picker failed before the user could select anything
    #[error("File selection failed: {0}")]
    Failed(String),
}

/// Errors that can occur when talking to the publish transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The publish server refused the request
    #[error("Publication rejected: {0}")]
    Rejected(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with something that is not a publish status
    #[error("Invalid publish status response: {0}")]
    InvalidResponse(String),
}

/// Error handed to the error continuation of a lifecycle operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    /// The user-facing picker or dialog failed
    #[error("Selection error: {0}")]
    Selection(String),

    /// The document could not be opened or parsed
    #[error("{message}")]
    Open {
        /// Message shown to the user
        message: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The publish transport failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl LifecycleError {
    /// Wrap a store error with the message that was shown to the user
    pub fn open(message: impl Into<String>, source: StoreError) -> Self {
        Self::Open {
            message: message.into(),
            source,
        }
    }
}

impl From<PickerError> for LifecycleError {
    fn from(error: PickerError) -> Self {
        Self::Selection(error.to_string())
    }
}

/// Main application error type used at the binary boundary
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error surfaced by a lifecycle operation
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(error.to_string()),
            _ => Self::Io(error.to_string()),
        }
    }
}
