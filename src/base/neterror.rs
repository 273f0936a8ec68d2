use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Every failure a call can resolve with.
///
/// Variants are grouped by where they originate; [`NetError::kind`] exposes
/// the grouping so call sites can decide whether a retry makes sense.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Request construction
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),

    // Transport / connection
    #[error("Request timed out")]
    RequestTimeout,
    #[error("No connection")]
    NoConnection,
    #[error("Unknown error: {cause} ({})", .note.as_deref().unwrap_or("no further details"))]
    Unknown {
        cause: Arc<io::Error>,
        note: Option<String>,
    },

    // Protocol shape
    #[error("Unsupported response: {0}")]
    UnsupportedResponse(String),

    // Response translation
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
    #[error("Unexpected status code {0}")]
    UnexpectedStatus(u16),

    #[error("Request cancelled")]
    Cancelled,

    // Configuration
    #[error("Invalid host pattern: {0}")]
    InvalidHostPattern(String),
    #[error("Failed to load certificates from {path}: {reason}")]
    CertificateLoad { path: String, reason: String },
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Coarse classification of a [`NetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be built; the transport was never touched.
    RequestConstruction,
    /// Timeout, connectivity loss or another low-level fault.
    Transport,
    /// The transport completed with something that is not an HTTP response.
    ProtocolShape,
    /// A well-formed response could not be mapped to the typed response.
    ResponseTranslation,
    /// The caller cancelled the call.
    Cancelled,
    /// Invalid configuration or trust material.
    Configuration,
}

impl NetError {
    /// Build an unclassified transport error.
    pub fn unknown(cause: io::Error, note: Option<String>) -> Self {
        NetError::Unknown {
            cause: Arc::new(cause),
            note,
        }
    }

    pub fn certificate_load(path: impl Into<String>, reason: impl ToString) -> Self {
        NetError::CertificateLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::InvalidRequest(_) | NetError::InvalidUrl(_) | NetError::Serialization(_) => {
                ErrorKind::RequestConstruction
            }
            NetError::RequestTimeout | NetError::NoConnection | NetError::Unknown { .. } => {
                ErrorKind::Transport
            }
            NetError::UnsupportedResponse(_) => ErrorKind::ProtocolShape,
            NetError::InvalidResponse(_)
            | NetError::Deserialization(_)
            | NetError::UnexpectedStatus(_) => ErrorKind::ResponseTranslation,
            NetError::Cancelled => ErrorKind::Cancelled,
            NetError::InvalidHostPattern(_)
            | NetError::CertificateLoad { .. }
            | NetError::Runtime(_) => ErrorKind::Configuration,
        }
    }

    /// Whether the failure came from the connection rather than from the
    /// request or response contents.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}
