//! ProtocolVersion handshake (RFC 6143 §7.1.1).
//!
//! The server announces `RFB xxx.yyy\n`; the client answers with one of the
//! two versions it speaks. Servers announcing 3.3-3.7 get 3.3, servers
//! announcing 3.8 or later get 3.8. Anything else is rejected without a reply.

use super::observer::{HandshakeEvent, HandshakeObserver, HandshakePhase};
use crate::errors::HandshakeError;
use crate::io::HandshakeTransport;
use std::fmt;

/// Length of a ProtocolVersion message.
pub const VERSION_MESSAGE_LEN: usize = 12;

/// Negotiated RFB protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiatedVersion {
    /// RFB 3.3 - server dictates the security type.
    V3_3,
    /// RFB 3.8 - security types are negotiated from a server-offered list.
    V3_8,
}

impl NegotiatedVersion {
    /// The canonical ProtocolVersion message for this version.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8; VERSION_MESSAGE_LEN] {
        match self {
            Self::V3_3 => b"RFB 003.003\n",
            Self::V3_8 => b"RFB 003.008\n",
        }
    }

    /// `(major, minor)` of this version.
    #[must_use]
    pub const fn major_minor(self) -> (u32, u32) {
        match self {
            Self::V3_3 => (3, 3),
            Self::V3_8 => (3, 8),
        }
    }
}

impl fmt::Display for NegotiatedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.major_minor();
        write!(f, "{}.{}", major, minor)
    }
}

/// Parse a ProtocolVersion message into `(major, minor)`.
///
/// The message must be exactly `RFB ` followed by three digits, `.`, three
/// digits and a linefeed.
pub fn parse_protocol_version(msg: &[u8]) -> Result<(u32, u32), HandshakeError> {
    let malformed = || HandshakeError::MalformedVersionMessage {
        raw: String::from_utf8_lossy(msg).into_owned(),
    };

    if msg.len() != VERSION_MESSAGE_LEN
        || &msg[0..4] != b"RFB "
        || msg[7] != b'.'
        || msg[11] != b'\n'
    {
        return Err(malformed());
    }

    let major = parse_digits(&msg[4..7]).ok_or_else(malformed)?;
    let minor = parse_digits(&msg[8..11]).ok_or_else(malformed)?;
    Ok((major, minor))
}

fn parse_digits(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &d| {
        d.is_ascii_digit().then(|| acc * 10 + u32::from(d - b'0'))
    })
}

/// Map a server's announced version to the version this client will speak.
///
/// Returns `None` when the client cannot interoperate.
#[must_use]
pub fn select_version(major: u32, minor: u32) -> Option<NegotiatedVersion> {
    match (major, minor) {
        (3, m) if m >= 8 => Some(NegotiatedVersion::V3_8),
        (3, m) if m >= 3 => Some(NegotiatedVersion::V3_3),
        _ => None,
    }
}

/// Read the server's version, choose ours and send it.
///
/// `version_override` replaces the derived choice, but only once the server's
/// announcement has been accepted.
pub(crate) async fn negotiate_version(
    transport: &mut dyn HandshakeTransport,
    version_override: Option<NegotiatedVersion>,
    observer: &dyn HandshakeObserver,
) -> Result<NegotiatedVersion, HandshakeError> {
    observer.on_event(&HandshakeEvent::PhaseStarted(HandshakePhase::ProtocolVersion));

    let mut version_buf = [0u8; VERSION_MESSAGE_LEN];
    transport.read_exact(&mut version_buf).await?;
    observer.on_event(&HandshakeEvent::ServerVersion { raw: &version_buf });

    let (major, minor) = parse_protocol_version(&version_buf)?;
    let derived = select_version(major, minor).ok_or_else(|| {
        HandshakeError::UnsupportedProtocolVersion {
            raw: String::from_utf8_lossy(&version_buf).into_owned(),
        }
    })?;

    let version = version_override.unwrap_or(derived);
    transport.write_all(version.as_bytes()).await?;
    observer.on_event(&HandshakeEvent::VersionSelected {
        version,
        overridden: version_override.is_some_and(|v| v != derived),
    });

    Ok(version)
}
