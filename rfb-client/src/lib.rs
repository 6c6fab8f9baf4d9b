//! Async RFB client connection setup.
//!
//! This crate turns a [`Config`] into an authenticated RFB session: it opens
//! the TCP transport, runs the `rfb-protocol` handshake over it and returns
//! the buffered streams ready for ClientInit.
//!
//! # Quick Start
//!
//! ```no_run
//! use rfb_client::{establish, init_logging, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rfb_client::RfbClientError> {
//!     let config = Config::builder()
//!         .host("localhost")
//!         .port(5900)
//!         .password("secret")
//!         .build()?;
//!     init_logging(&config.logging.filter);
//!
//!     let conn = establish(&config).await?;
//!     println!("RFB {} using {}", conn.version, conn.security_type);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Failures are reported immediately; nothing is retried internally.
//! [`RfbClientError::is_retryable`] separates transient transport failures
//! from fatal ones (server refusal, protocol mismatch, misconfiguration) for
//! callers that implement their own retry policy.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod transport;

pub use config::Config;
pub use connection::{establish, Connection};
pub use errors::RfbClientError;

use tracing_subscriber::EnvFilter;

/// Install a `tracing` fmt subscriber.
///
/// `RUST_LOG` takes precedence; `default_filter` is used when it is unset or
/// invalid. Calling this more than once is harmless.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
