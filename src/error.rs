//! Error types for transports and the client runtime

use thiserror::Error;

/// Transport failure with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Server, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }
}

/// Error classification reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection problems, timeouts
    Network,
    /// The addressed conversation does not exist on the server
    NotFound,
    /// The server rejected the request (400)
    InvalidRequest,
    /// Server-side failure (5xx), including assistant generation errors
    Server,
    Unknown,
}

/// A wire timestamp that could not be normalized into UTC
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid timestamp {input:?}: {reason}")]
pub struct TimestampError {
    pub input: String,
    pub reason: String,
}

/// Errors surfaced by the client handle and startup code
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Chat runtime has stopped")]
    RuntimeStopped,
    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
