//! Session error taxonomy
//!
//! Every failure that ends a preview session maps onto one of four kinds.
//! None of them are retried; the session goes to `Errored` and stays there.

use thiserror::Error;

use crate::source::SourceError;

/// Errors that terminate a preview session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    /// The transport could not be opened or cannot deliver incremental reads
    #[error("Transport unavailable: {0}")]
    TransportUnsupported(String),

    /// The transport closed before all bytes arrived
    #[error("{}", interrupted_message(.received, .expected))]
    TransportInterrupted { received: u64, expected: Option<u64> },

    /// The renderer rejected the bytes
    #[error("Could not decode audio: {0}")]
    DecodeFailure(String),

    /// Anything unexpected during assembly
    #[error("Unexpected error: {0}")]
    UnknownFailure(String),
}

fn interrupted_message(received: &u64, expected: &Option<u64>) -> String {
    match expected {
        Some(total) => format!("Transfer interrupted after {received} of {total} bytes"),
        None => format!("Transfer interrupted after {received} bytes"),
    }
}

/// Discriminant of [`PreviewError`], useful for matching without payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransportUnsupported,
    TransportInterrupted,
    DecodeFailure,
    UnknownFailure,
}

impl PreviewError {
    /// Which of the four kinds this error is
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreviewError::TransportUnsupported(_) => ErrorKind::TransportUnsupported,
            PreviewError::TransportInterrupted { .. } => ErrorKind::TransportInterrupted,
            PreviewError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            PreviewError::UnknownFailure(_) => ErrorKind::UnknownFailure,
        }
    }

    /// True for failures reported by the renderer rather than the transfer
    pub fn is_decode(&self) -> bool {
        self.kind() == ErrorKind::DecodeFailure
    }
}

impl From<SourceError> for PreviewError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unsupported(reason) => PreviewError::TransportUnsupported(reason),
            SourceError::Http { status, message } => {
                PreviewError::TransportUnsupported(format!("HTTP {status} {message}"))
            }
            SourceError::Interrupted { received, expected, .. } => {
                PreviewError::TransportInterrupted { received, expected }
            }
            SourceError::Cancelled => PreviewError::UnknownFailure("transfer cancelled".to_string()),
            SourceError::Io(e) => PreviewError::UnknownFailure(e.to_string()),
        }
    }
}

/// Result type for session operations
pub type PreviewResult<T> = Result<T, PreviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_message_mentions_both_counts() {
        let err = PreviewError::TransportInterrupted {
            received: 2,
            expected: Some(5),
        };
        assert_eq!(err.to_string(), "Transfer interrupted after 2 of 5 bytes");

        let err = PreviewError::TransportInterrupted {
            received: 7,
            expected: None,
        };
        assert_eq!(err.to_string(), "Transfer interrupted after 7 bytes");
    }

    #[test]
    fn test_source_errors_map_to_session_kinds() {
        let err: PreviewError = SourceError::Unsupported("no body".into()).into();
        assert_eq!(err.kind(), ErrorKind::TransportUnsupported);

        let err: PreviewError = SourceError::Http {
            status: 404,
            message: "Not Found".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::TransportUnsupported);

        let err: PreviewError = SourceError::Interrupted {
            received: 10,
            expected: Some(20),
            reason: "reset".into(),
        }
        .into();
        assert_eq!(
            err,
            PreviewError::TransportInterrupted {
                received: 10,
                expected: Some(20)
            }
        );
    }

    #[test]
    fn test_decode_failure_is_decode() {
        assert!(PreviewError::DecodeFailure("bad header".into()).is_decode());
        assert!(!PreviewError::UnknownFailure("x".into()).is_decode());
    }
}
