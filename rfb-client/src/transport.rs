//! TCP transport for RFB connections.
//!
//! Deadlines are enforced here rather than inside the handshake: a connect
//! that does not finish within the configured timeout fails with
//! [`RfbClientError::Timeout`].
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::transport::connect_tcp;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = connect_tcp("localhost", 5900, Duration::from_secs(5)).await?;
//! // Hand `stream` to the RFB handshake
//! # Ok(())
//! # }
//! ```

use crate::errors::RfbClientError;
use rfb_protocol::RfbStream;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A buffered RFB stream over a TCP connection.
pub type TcpRfbStream = RfbStream<OwnedReadHalf, OwnedWriteHalf>;

/// Connect to an RFB server via TCP.
///
/// The socket has `TCP_NODELAY` set; RFB traffic is dominated by small
/// interactive messages.
pub async fn connect_tcp(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpRfbStream, RfbClientError> {
    let addr = format!("{}:{}", host, port);
    let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| RfbClientError::Timeout(timeout))?
        .map_err(|e| {
            RfbClientError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
        })?;

    stream.set_nodelay(true).map_err(|e| {
        RfbClientError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
    })?;

    // Log local and remote addresses for correlation with server logs
    if let (Ok(local), Ok(peer)) = (stream.local_addr(), stream.peer_addr()) {
        tracing::info!("Connected via TCP: local={} -> remote={}", local, peer);
    } else {
        tracing::info!("Connected to {} via TCP", addr);
    }

    let (reader, writer) = stream.into_split();
    Ok(RfbStream::new(reader, writer))
}
