//! RFB (Remote Framebuffer) connection handshake.
//!
//! This crate implements the client side of the RFB connection handshake
//! (RFC 6143 §7.1): protocol version negotiation, security type negotiation,
//! pluggable authentication and the SecurityResult check. Everything after the
//! handshake (ClientInit/ServerInit, framebuffer updates, input events) is left
//! to the caller, which gets the buffered streams back intact.
//!
//! # Modules
//!
//! - [`io`] - Buffered I/O streams and the [`HandshakeTransport`] trait
//! - [`handshake`] - The handshake phases and orchestrator
//! - [`errors`] - The [`HandshakeError`] taxonomy
//!
//! # Examples
//!
//! ```no_run
//! use rfb_protocol::{run_handshake, AuthConfig, HandshakeConfig, NoopObserver, RfbStream};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = tokio::net::TcpStream::connect("localhost:5900").await?;
//! let (reader, writer) = tokio::io::split(socket);
//! let mut stream = RfbStream::new(reader, writer);
//!
//! let config = HandshakeConfig::new(AuthConfig::standard());
//! let outcome = run_handshake(&mut stream, &config, &NoopObserver).await?;
//! println!("negotiated RFB {}", outcome.version);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod handshake;
pub mod io;

// Re-export commonly used types
pub use errors::{FailureCategory, HandshakeError};
pub use handshake::auth::{
    AuthConfig, NoAuth, SecurityMechanism, SecurityType, SelectionPolicy, VncAuth,
    DEFAULT_SELECTION_POLICY,
};
pub use handshake::observer::{
    HandshakeEvent, HandshakeObserver, HandshakePhase, NoopObserver, TracingObserver,
};
pub use handshake::version::NegotiatedVersion;
pub use handshake::{run_handshake, Handshake, HandshakeConfig, HandshakeOutcome};
pub use io::{HandshakeTransport, RfbInStream, RfbOutStream, RfbStream};
