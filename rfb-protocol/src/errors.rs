//! Error types for the RFB handshake.

use crate::handshake::auth::SecurityType;
use std::io;
use thiserror::Error;

/// Errors that abort an RFB handshake.
///
/// None of these are retried by the handshake itself. Each variant keeps the
/// server-supplied text or the type codes involved so callers can tell a
/// server refusal from a protocol mismatch or a local misconfiguration.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The ProtocolVersion message did not match `RFB ddd.ddd\n`.
    #[error("malformed ProtocolVersion message: {raw:?}")]
    MalformedVersionMessage {
        /// The bytes received, lossily decoded.
        raw: String,
    },

    /// The server announced a version this client cannot speak.
    #[error("unsupported RFB version {raw:?}")]
    UnsupportedProtocolVersion {
        /// The server's announcement, verbatim.
        raw: String,
    },

    /// The server refused the connection during security negotiation.
    #[error("server refused connection: {reason}")]
    ConnectionRefused {
        /// Reason text supplied by the server.
        reason: String,
    },

    /// None of the offered security types is configured on this client.
    #[error("no suitable security type; server offered {offered:?}")]
    NoSuitableMechanism {
        /// Type codes the server offered, in the server's order.
        offered: Vec<u32>,
    },

    /// A security mechanism's own sub-protocol failed.
    #[error("{security_type} authentication handshake failed: {source}")]
    MechanismHandshakeFailed {
        /// The mechanism that was running.
        security_type: SecurityType,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// SecurityResult reported failure.
    #[error("authentication rejected: {reason}")]
    AuthenticationRejected {
        /// Reason text supplied by the server (empty on RFB 3.3).
        reason: String,
    },

    /// SecurityResult carried a value other than 0 or 1.
    #[error("invalid SecurityResult value {value} (expected 0 or 1)")]
    InvalidResultCode {
        /// The value received.
        value: u32,
    },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

/// Coarse classification of a [`HandshakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The server deliberately refused or rejected us.
    ServerRefused,
    /// The peers do not speak a compatible protocol, or the server misbehaved.
    ProtocolMismatch,
    /// Our configuration has no overlap with what the server offers.
    LocalMisconfiguration,
    /// A security mechanism failed for a reason other than the byte stream.
    MechanismFailed,
    /// The byte stream failed.
    Transport,
}

impl HandshakeError {
    /// Classify this error.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::ConnectionRefused { .. } | Self::AuthenticationRejected { .. } => {
                FailureCategory::ServerRefused
            }
            Self::MalformedVersionMessage { .. }
            | Self::UnsupportedProtocolVersion { .. }
            | Self::InvalidResultCode { .. } => FailureCategory::ProtocolMismatch,
            Self::NoSuitableMechanism { .. } => FailureCategory::LocalMisconfiguration,
            Self::MechanismHandshakeFailed { source, .. } if is_stream_failure(source.kind()) => {
                FailureCategory::Transport
            }
            Self::MechanismHandshakeFailed { .. } => FailureCategory::MechanismFailed,
            Self::Transport(_) => FailureCategory::Transport,
        }
    }

    /// Server-supplied reason text, if this error carries one.
    #[must_use]
    pub fn server_reason(&self) -> Option<&str> {
        match self {
            Self::ConnectionRefused { reason } | Self::AuthenticationRejected { reason } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

/// Error kinds that mean the connection itself broke.
fn is_stream_failure(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WriteZero
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
