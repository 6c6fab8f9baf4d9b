//! SecurityResult handshake (RFC 6143 §7.1.3) and failure-reason decoding.

use super::auth::SecurityType;
use super::observer::{HandshakeEvent, HandshakeObserver, HandshakePhase};
use super::version::NegotiatedVersion;
use crate::errors::HandshakeError;
use crate::io::HandshakeTransport;

/// SecurityResult value for success.
pub const SECURITY_RESULT_OK: u32 = 0;
/// SecurityResult value for failure.
pub const SECURITY_RESULT_FAILED: u32 = 1;

/// Whether the server sends a SecurityResult for this session.
///
/// RFB 3.8 always sends one. RFB 3.3 sends one only after an authenticating
/// security type, so a 3.3 session using `None` goes straight to
/// initialisation.
#[must_use]
pub fn security_result_expected(version: NegotiatedVersion, security_type: SecurityType) -> bool {
    !(version == NegotiatedVersion::V3_3 && security_type == SecurityType::NONE)
}

/// Upper bound on each read of reason text.
const REASON_CHUNK_LEN: usize = 4096;

/// Read a failure reason: a `u32` length followed by that many bytes of text.
///
/// The text is decoded lossily; a zero length yields an empty string. A short
/// read at either step is a transport error. The buffer grows as bytes
/// arrive, so a bogus length costs at most one chunk beyond what was sent.
pub async fn read_failure_reason(
    transport: &mut dyn HandshakeTransport,
) -> Result<String, HandshakeError> {
    let reason_len = transport.read_u32().await? as usize;
    let mut reason_buf = Vec::with_capacity(reason_len.min(REASON_CHUNK_LEN));
    let mut chunk = [0u8; REASON_CHUNK_LEN];
    while reason_buf.len() < reason_len {
        let n = (reason_len - reason_buf.len()).min(REASON_CHUNK_LEN);
        transport.read_exact(&mut chunk[..n]).await?;
        reason_buf.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&reason_buf).into_owned())
}

/// Run the SecurityResult phase, or skip it when the server sends none.
pub(crate) async fn check_security_result(
    transport: &mut dyn HandshakeTransport,
    version: NegotiatedVersion,
    security_type: SecurityType,
    observer: &dyn HandshakeObserver,
) -> Result<(), HandshakeError> {
    if !security_result_expected(version, security_type) {
        observer.on_event(&HandshakeEvent::SecurityResultSkipped);
        return Ok(());
    }
    observer.on_event(&HandshakeEvent::PhaseStarted(HandshakePhase::SecurityResult));

    let value = transport.read_u32().await?;
    observer.on_event(&HandshakeEvent::SecurityResult { value });

    match value {
        SECURITY_RESULT_OK => Ok(()),
        SECURITY_RESULT_FAILED => {
            // 3.3 servers close the connection without a reason string.
            let reason = match version {
                NegotiatedVersion::V3_8 => read_failure_reason(transport).await?,
                NegotiatedVersion::V3_3 => String::new(),
            };
            Err(HandshakeError::AuthenticationRejected { reason })
        }
        other => Err(HandshakeError::InvalidResultCode { value: other }),
    }
}
