//! Error types for SMTP submission.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The server answered a command with a non-success reply.
    #[error("SMTP error {code}: {message}")]
    Rejected {
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// The server sent something that is not a valid SMTP reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The server does not advertise a required extension.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// The connection closed before a complete reply was read.
    #[error("Connection closed by server")]
    ConnectionClosed,
}

impl Error {
    /// Creates a rejection error from a reply code and text.
    #[must_use]
    pub fn rejected(code: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the server rejected the request permanently (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if the server rejected the request temporarily (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classes() {
        assert!(Error::rejected(550, "no such user").is_permanent());
        assert!(!Error::rejected(550, "no such user").is_transient());
        assert!(Error::rejected(451, "try later").is_transient());
        assert!(!Error::Protocol("garbage".into()).is_permanent());
    }

    #[test]
    fn test_rejection_display() {
        let err = Error::rejected(554, "Transaction failed");
        assert_eq!(err.to_string(), "SMTP error 554: Transaction failed");
    }
}
