//! Error types for byte sources

use thiserror::Error;

/// Errors that can occur while fetching audio bytes
#[derive(Debug, Error)]
pub enum SourceError {
    /// The transport could not be opened, or cannot stream when required
    #[error("Transport unsupported: {0}")]
    Unsupported(String),

    /// Error status from the file server
    #[error("HTTP error: {status} - {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Status text or response body
        message: String,
    },

    /// The transport closed before the body was complete
    #[error("Transfer interrupted after {received} bytes: {reason}")]
    Interrupted {
        /// Bytes delivered before the failure
        received: u64,
        /// Declared total length, if the origin sent one
        expected: Option<u64>,
        /// What the transport reported
        reason: String,
    },

    /// The session cancelled the transfer
    #[error("Transfer cancelled")]
    Cancelled,

    /// Local I/O error outside of a transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for byte source operations
pub type SourceResult<T> = Result<T, SourceError>;
