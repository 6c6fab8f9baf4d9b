//! RFB connection handshake (RFC 6143 §7.1).
//!
//! The handshake runs three phases in strict order over a transport it owns
//! exclusively:
//!
//! 1. **Protocol Version** ([`version`]) - agree on RFB 3.3 or 3.8
//! 2. **Security** ([`security`], [`auth`]) - pick a security type and run
//!    its authentication sub-handshake
//! 3. **SecurityResult** ([`result`]) - read the server's verdict, when one is
//!    sent for the negotiated version and security type
//!
//! The first failure aborts the handshake. The transport is then in an
//! unknown state and must be closed by the caller; nothing is retried here.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_protocol::handshake::{auth::AuthConfig, Handshake, HandshakeConfig};
//! use rfb_protocol::io::RfbStream;
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = TcpStream::connect("localhost:5900").await?;
//! let (reader, writer) = tokio::io::split(socket);
//! let mut stream = RfbStream::new(reader, writer);
//!
//! let config = HandshakeConfig::new(AuthConfig::standard().with_password("secret"));
//! let outcome = Handshake::new(config).run(&mut stream).await?;
//! println!("RFB {} using {}", outcome.version, outcome.security_type);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod observer;
pub mod result;
pub mod security;
pub mod version;

use crate::errors::HandshakeError;
use crate::io::HandshakeTransport;
use auth::{AuthConfig, SecurityType};
use observer::{HandshakeEvent, HandshakeObserver, TracingObserver};
use std::sync::Arc;
use version::NegotiatedVersion;

/// Inputs to a handshake.
#[derive(Debug, Clone, Default)]
pub struct HandshakeConfig {
    /// Mechanisms and secret offered during security negotiation.
    pub auth: AuthConfig,
    /// Force this version instead of the one derived from the server's
    /// announcement. Only applied when the server's version is supported.
    pub version_override: Option<NegotiatedVersion>,
}

impl HandshakeConfig {
    /// A configuration with no version override.
    #[must_use]
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            version_override: None,
        }
    }

    /// Force the negotiated version.
    #[must_use]
    pub fn with_version_override(mut self, version: NegotiatedVersion) -> Self {
        self.version_override = Some(version);
        self
    }
}

/// Facts established by a successful handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeOutcome {
    /// Negotiated protocol version.
    pub version: NegotiatedVersion,
    /// Security type in use for the session.
    pub security_type: SecurityType,
}

/// Mutable state threaded through the phases.
///
/// Each field is set at most once.
#[derive(Debug, Default)]
pub struct HandshakeSession {
    version: Option<NegotiatedVersion>,
    security_type: Option<SecurityType>,
}

impl HandshakeSession {
    /// A session with nothing negotiated yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The negotiated version, once the version phase has completed.
    pub fn version(&self) -> Option<NegotiatedVersion> {
        self.version
    }

    /// The chosen security type, once security negotiation has picked one.
    pub fn security_type(&self) -> Option<SecurityType> {
        self.security_type
    }

    pub(crate) fn record_version(&mut self, version: NegotiatedVersion) {
        debug_assert!(self.version.is_none(), "protocol version already negotiated");
        self.version = Some(version);
    }

    pub(crate) fn record_security_type(&mut self, security_type: SecurityType) {
        debug_assert!(self.security_type.is_none(), "security type already chosen");
        self.security_type = Some(security_type);
    }
}

/// Run the full handshake over `transport`.
///
/// Phases run strictly in sequence; each finishes (including any bytes it
/// sends) before the next starts.
pub async fn run_handshake(
    transport: &mut dyn HandshakeTransport,
    config: &HandshakeConfig,
    observer: &dyn HandshakeObserver,
) -> Result<HandshakeOutcome, HandshakeError> {
    let mut session = HandshakeSession::new();

    let version =
        version::negotiate_version(transport, config.version_override, observer).await?;
    session.record_version(version);

    let security_type =
        security::negotiate_security(transport, &mut session, version, &config.auth, observer)
            .await?;

    result::check_security_result(transport, version, security_type, observer).await?;

    let outcome = HandshakeOutcome {
        version,
        security_type,
    };
    observer.on_event(&HandshakeEvent::Completed {
        version,
        security_type,
    });
    Ok(outcome)
}

/// A configured handshake with an injected observer.
pub struct Handshake {
    config: HandshakeConfig,
    observer: Arc<dyn HandshakeObserver>,
}

impl Handshake {
    /// A handshake reporting to a [`TracingObserver`] at its default level.
    #[must_use]
    pub fn new(config: HandshakeConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver::default()),
        }
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn HandshakeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configuration this handshake runs with.
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Run the handshake over `transport`.
    pub async fn run(
        &self,
        transport: &mut dyn HandshakeTransport,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        run_handshake(transport, &self.config, self.observer.as_ref()).await
    }
}
