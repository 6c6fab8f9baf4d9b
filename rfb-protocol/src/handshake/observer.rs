//! Handshake progress reporting.
//!
//! The orchestrator reports each step to an injected [`HandshakeObserver`]
//! instead of logging through a global. [`TracingObserver`] forwards events to
//! `tracing` at a configured level.

use super::auth::SecurityType;
use super::version::NegotiatedVersion;
use std::fmt;
use tracing::Level;

/// The phases of the handshake, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// ProtocolVersion exchange (§7.1.1).
    ProtocolVersion,
    /// Security type negotiation and authentication (§7.1.2).
    Security,
    /// SecurityResult (§7.1.3).
    SecurityResult,
}

/// A single step of handshake progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent<'a> {
    /// A phase is about to start.
    PhaseStarted(HandshakePhase),
    /// The server's ProtocolVersion message, verbatim.
    ServerVersion {
        /// The 12 bytes the server sent.
        raw: &'a [u8],
    },
    /// The version this client will speak has been chosen and sent.
    VersionSelected {
        /// The chosen version.
        version: NegotiatedVersion,
        /// Whether a configured override replaced the derived choice.
        overridden: bool,
    },
    /// The security types an RFB 3.8 server offered.
    SecurityTypesOffered {
        /// Codes in the server's order.
        offered: &'a [SecurityType],
    },
    /// The security type that will be used.
    SecurityTypeChosen {
        /// The chosen type.
        security_type: SecurityType,
    },
    /// No SecurityResult is sent for this version/type combination.
    SecurityResultSkipped,
    /// The raw SecurityResult value.
    SecurityResult {
        /// 0 for success, 1 for failure.
        value: u32,
    },
    /// The handshake finished successfully.
    Completed {
        /// Negotiated version.
        version: NegotiatedVersion,
        /// Security type in use.
        security_type: SecurityType,
    },
}

impl fmt::Display for HandshakeEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseStarted(phase) => write!(f, "{:?} phase started", phase),
            Self::ServerVersion { raw } => {
                write!(f, "server version {:?}", String::from_utf8_lossy(raw))
            }
            Self::VersionSelected {
                version,
                overridden,
            } => {
                if *overridden {
                    write!(f, "selected RFB {} (configured override)", version)
                } else {
                    write!(f, "selected RFB {}", version)
                }
            }
            Self::SecurityTypesOffered { offered } => {
                write!(f, "server offered security types [")?;
                for (i, t) in offered.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "]")
            }
            Self::SecurityTypeChosen { security_type } => {
                write!(f, "using security type {}", security_type)
            }
            Self::SecurityResultSkipped => write!(f, "no SecurityResult for this session"),
            Self::SecurityResult { value } => write!(f, "SecurityResult {}", value),
            Self::Completed {
                version,
                security_type,
            } => write!(f, "handshake complete: RFB {}, {}", version, security_type),
        }
    }
}

/// Receives handshake progress events.
pub trait HandshakeObserver: Send + Sync {
    /// Called once per event, in wire order.
    fn on_event(&self, event: &HandshakeEvent<'_>);
}

/// Forwards events to `tracing` under the `rfb_handshake` target.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    level: Level,
}

impl TracingObserver {
    /// Emit events at `level`.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// The level events are emitted at.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl HandshakeObserver for TracingObserver {
    fn on_event(&self, event: &HandshakeEvent<'_>) {
        match self.level {
            Level::ERROR => tracing::error!(target: "rfb_handshake", "{}", event),
            Level::WARN => tracing::warn!(target: "rfb_handshake", "{}", event),
            Level::INFO => tracing::info!(target: "rfb_handshake", "{}", event),
            Level::DEBUG => tracing::debug!(target: "rfb_handshake", "{}", event),
            _ => tracing::trace!(target: "rfb_handshake", "{}", event),
        }
    }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl HandshakeObserver for NoopObserver {
    fn on_event(&self, _event: &HandshakeEvent<'_>) {}
}
