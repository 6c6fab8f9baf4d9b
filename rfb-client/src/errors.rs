//! Error types for the RFB client.

use rfb_protocol::{FailureCategory, HandshakeError};
use std::io;
use thiserror::Error;

/// Errors that can occur while establishing an RFB session.
#[derive(Debug, Error)]
pub enum RfbClientError {
    /// Transport-level error after the connection was established.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Connection failed (TCP connection establishment failed).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The RFB handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Connection or handshake timeout.
    #[error("Connection timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RfbClientError {
    /// Returns true if this error is potentially retryable.
    ///
    /// Transport failures and timeouts may succeed on retry. Server refusals,
    /// protocol mismatches, mechanism failures not caused by the connection
    /// and configuration errors will not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::ConnectionFailed(_) => true,
            Self::Handshake(e) => e.category() == FailureCategory::Transport,
            Self::Config(_) => false,
        }
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}
