//! Security handshake (RFC 6143 §7.1.2).
//!
//! The wire shape depends on the negotiated version:
//!
//! - **RFB 3.3**: the server sends a single `u32` security type and the client
//!   must use it. The client's configured list is not consulted.
//! - **RFB 3.8**: the server sends a count and a list of `u8` types; the
//!   client picks one per its [`SelectionPolicy`](super::auth::SelectionPolicy)
//!   and echoes it back.
//!
//! In both cases a zero/invalid answer from the server is followed by a reason
//! string and means the connection was refused.

use super::auth::{AuthConfig, NoAuth, SecurityMechanism, SecurityType, VncAuth};
use super::observer::{HandshakeEvent, HandshakeObserver, HandshakePhase};
use super::result::read_failure_reason;
use super::version::NegotiatedVersion;
use super::HandshakeSession;
use crate::errors::HandshakeError;
use crate::io::HandshakeTransport;
use std::sync::Arc;

/// Negotiate the security type and run the chosen mechanism.
///
/// The chosen type is recorded on `session` before the mechanism runs.
pub(crate) async fn negotiate_security(
    transport: &mut dyn HandshakeTransport,
    session: &mut HandshakeSession,
    version: NegotiatedVersion,
    auth: &AuthConfig,
    observer: &dyn HandshakeObserver,
) -> Result<SecurityType, HandshakeError> {
    observer.on_event(&HandshakeEvent::PhaseStarted(HandshakePhase::Security));

    let mechanism = match version {
        NegotiatedVersion::V3_3 => negotiate_security_3_3(transport).await?,
        NegotiatedVersion::V3_8 => negotiate_security_3_8(transport, auth, observer).await?,
    };

    let security_type = mechanism.security_type();
    session.record_security_type(security_type);
    observer.on_event(&HandshakeEvent::SecurityTypeChosen { security_type });

    mechanism
        .authenticate(transport, auth.password())
        .await
        .map_err(|source| HandshakeError::MechanismHandshakeFailed {
            security_type,
            source,
        })?;

    Ok(security_type)
}

async fn negotiate_security_3_3(
    transport: &mut dyn HandshakeTransport,
) -> Result<Arc<dyn SecurityMechanism>, HandshakeError> {
    let code = transport.read_u32().await?;

    let mechanism: Arc<dyn SecurityMechanism> = match u8::try_from(code).map(SecurityType) {
        Ok(SecurityType::INVALID) => {
            let reason = read_failure_reason(transport).await?;
            return Err(HandshakeError::ConnectionRefused { reason });
        }
        Ok(SecurityType::NONE) => Arc::new(NoAuth),
        Ok(SecurityType::VNC_AUTH) => Arc::new(VncAuth),
        _ => {
            return Err(HandshakeError::NoSuitableMechanism {
                offered: vec![code],
            })
        }
    };
    Ok(mechanism)
}

async fn negotiate_security_3_8(
    transport: &mut dyn HandshakeTransport,
    auth: &AuthConfig,
    observer: &dyn HandshakeObserver,
) -> Result<Arc<dyn SecurityMechanism>, HandshakeError> {
    let count = transport.read_u8().await?;
    if count == 0 {
        let reason = read_failure_reason(transport).await?;
        return Err(HandshakeError::ConnectionRefused { reason });
    }

    let mut codes = vec![0u8; usize::from(count)];
    transport.read_exact(&mut codes).await?;
    let offered: Vec<SecurityType> = codes.iter().copied().map(SecurityType).collect();
    observer.on_event(&HandshakeEvent::SecurityTypesOffered { offered: &offered });

    let mechanism = auth
        .select(&offered)
        .ok_or_else(|| HandshakeError::NoSuitableMechanism {
            offered: codes.iter().copied().map(u32::from).collect(),
        })?;

    transport.write_u8(mechanism.security_type().code()).await?;
    Ok(mechanism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureCategory;
    use crate::handshake::observer::NoopObserver;
    use crate::io::RfbStream;
    use async_trait::async_trait;
    use std::io::Cursor;

    async fn negotiate(
        server: Vec<u8>,
        version: NegotiatedVersion,
        auth: &AuthConfig,
    ) -> (Result<SecurityType, HandshakeError>, HandshakeSession, Vec<u8>) {
        let mut written = Vec::new();
        let mut session = HandshakeSession::new();
        session.record_version(version);
        let result = {
            let mut stream = RfbStream::new(Cursor::new(server), &mut written);
            negotiate_security(&mut stream, &mut session, version, auth, &NoopObserver).await
        };
        (result, session, written)
    }

    #[derive(Debug)]
    struct FailingMechanism;

    #[async_trait]
    impl SecurityMechanism for FailingMechanism {
        fn security_type(&self) -> SecurityType {
            SecurityType(42)
        }

        async fn authenticate(
            &self,
            _transport: &mut dyn HandshakeTransport,
            _password: Option<&str>,
        ) -> std::io::Result<()> {
            Err(std::io::Error::other("token expired"))
        }
    }

    #[tokio::test]
    async fn test_security_none_3_3() {
        let (result, session, written) =
            negotiate(vec![0, 0, 0, 1], NegotiatedVersion::V3_3, &AuthConfig::new()).await;
        assert_eq!(result.unwrap(), SecurityType::NONE);
        assert_eq!(session.security_type(), Some(SecurityType::NONE));
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_vnc_auth_3_3_ignores_configured_list() {
        let mut server = vec![0, 0, 0, 2];
        server.extend_from_slice(&[0u8; 16]);
        let auth = AuthConfig::new().with_mechanism(NoAuth);
        let (result, _, written) = negotiate(server, NegotiatedVersion::V3_3, &auth).await;
        assert_eq!(result.unwrap(), SecurityType::VNC_AUTH);
        // Only the challenge response is sent; 3.3 has no type echo.
        assert_eq!(written.len(), 16);
    }

    #[tokio::test]
    async fn test_invalid_type_3_3_is_refusal() {
        let mut server = vec![0, 0, 0, 0, 0, 0, 0, 4];
        server.extend_from_slice(b"busy");
        let (result, session, _) =
            negotiate(server, NegotiatedVersion::V3_3, &AuthConfig::standard()).await;
        match result.unwrap_err() {
            HandshakeError::ConnectionRefused { reason } => assert_eq!(reason, "busy"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.security_type(), None);
    }

    #[tokio::test]
    async fn test_unknown_type_3_3() {
        let (result, _, _) =
            negotiate(vec![0, 0, 1, 0], NegotiatedVersion::V3_3, &AuthConfig::standard()).await;
        match result.unwrap_err() {
            HandshakeError::NoSuitableMechanism { offered } => assert_eq!(offered, vec![256]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_order_wins_3_8() {
        let mut server = vec![2, 19, 2];
        server.extend_from_slice(&[0u8; 16]);
        let auth = AuthConfig::new().with_mechanism(VncAuth);
        let (result, session, written) = negotiate(server, NegotiatedVersion::V3_8, &auth).await;
        assert_eq!(result.unwrap(), SecurityType::VNC_AUTH);
        assert_eq!(session.security_type(), Some(SecurityType::VNC_AUTH));
        assert_eq!(written[0], 2);
        assert_eq!(written.len(), 17);
    }

    #[tokio::test]
    async fn test_no_overlap_3_8() {
        let auth = AuthConfig::new().with_mechanism(NoAuth).with_mechanism(VncAuth);
        let (result, _, written) = negotiate(vec![2, 5, 6], NegotiatedVersion::V3_8, &auth).await;
        match result.unwrap_err() {
            HandshakeError::NoSuitableMechanism { offered } => assert_eq!(offered, vec![5, 6]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_zero_types_3_8_is_refusal() {
        let mut server = vec![0, 0, 0, 0, 3];
        server.extend_from_slice(b"no!");
        let (result, _, written) =
            negotiate(server, NegotiatedVersion::V3_8, &AuthConfig::standard()).await;
        match result.unwrap_err() {
            HandshakeError::ConnectionRefused { reason } => assert_eq!(reason, "no!"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_mechanism_failure_records_type_first() {
        let auth = AuthConfig::new().with_mechanism(FailingMechanism);
        let (result, session, written) =
            negotiate(vec![1, 42], NegotiatedVersion::V3_8, &auth).await;
        let err = result.unwrap_err();
        assert_eq!(err.category(), FailureCategory::MechanismFailed);
        match err {
            HandshakeError::MechanismHandshakeFailed {
                security_type,
                source,
            } => {
                assert_eq!(security_type, SecurityType(42));
                assert_eq!(source.to_string(), "token expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.security_type(), Some(SecurityType(42)));
        assert_eq!(written, vec![42]);
    }

    #[tokio::test]
    async fn test_truncated_challenge_is_mechanism_failure() {
        let mut server = vec![1, 2];
        server.extend_from_slice(&[0u8; 5]);
        let (result, _, _) =
            negotiate(server, NegotiatedVersion::V3_8, &AuthConfig::standard()).await;
        let err = result.unwrap_err();
        assert_eq!(err.category(), FailureCategory::Transport);
        assert!(matches!(
            err,
            HandshakeError::MechanismHandshakeFailed {
                security_type: SecurityType::VNC_AUTH,
                ..
            }
        ));
    }
}
