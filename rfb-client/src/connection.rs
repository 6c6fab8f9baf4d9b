//! High-level connection management and handshake.
//!
//! Establishes a TCP transport and performs the RFB handshake over it.
//! The returned [`Connection`] holds the buffered stream, positioned right
//! after the handshake and ready for ClientInit.

use crate::{config::Config, errors::RfbClientError, transport};
use rfb_protocol::{
    Handshake, NegotiatedVersion, RfbInStream, RfbOutStream, SecurityType, TracingObserver,
};
use std::fmt;
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Connected RFB session components.
pub struct Connection {
    /// Buffered input stream for reading RFB data.
    pub input: RfbInStream<OwnedReadHalf>,
    /// Buffered output stream for writing RFB data.
    pub output: RfbOutStream<OwnedWriteHalf>,
    /// Negotiated protocol version.
    pub version: NegotiatedVersion,
    /// Security type in use.
    pub security_type: SecurityType,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("version", &self.version)
            .field("security_type", &self.security_type)
            .field("buffered_input", &self.input.available())
            .finish_non_exhaustive()
    }
}

/// Establish a new RFB connection using the given configuration.
///
/// Steps:
/// 1) Create the TCP transport (bounded by the configured timeout)
/// 2) Run the handshake (bounded by the same timeout)
/// 3) Hand the buffered streams back to the caller
///
/// On failure the transport is dropped, closing the socket.
pub async fn establish(config: &Config) -> Result<Connection, RfbClientError> {
    config.validate()?;
    let timeout = config.timeout();

    // 1) Transport
    let host = &config.connection.host;
    let port = config.connection.port;
    let mut stream = transport::connect_tcp(host, port, timeout).await?;

    // 2) Handshake
    let observer = Arc::new(TracingObserver::new(config.handshake_level()?));
    let handshake = Handshake::new(config.handshake_config()).with_observer(observer);
    let outcome = tokio::time::timeout(timeout, handshake.run(&mut stream))
        .await
        .map_err(|_| RfbClientError::Timeout(timeout))??;

    tracing::info!(
        "RFB handshake complete with {}:{}: version {}, security {}",
        host,
        port,
        outcome.version,
        outcome.security_type
    );

    // 3) Streams
    let (input, output) = stream.into_parts();
    Ok(Connection {
        input,
        output,
        version: outcome.version,
        security_type: outcome.security_type,
    })
}
