//! Connection tests against an in-process fake RFB server.

use pretty_assertions::assert_eq;
use rfb_client::config::{ProtocolVersionSetting, SecurityTypeName};
use rfb_client::{establish, Config, RfbClientError};
use rfb_protocol::handshake::auth::vnc_auth_response;
use rfb_protocol::{HandshakeError, NegotiatedVersion, SecurityType};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn read_version(socket: &mut TcpStream) -> [u8; 12] {
    let mut buf = [0u8; 12];
    socket.read_exact(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn test_establish_with_vnc_auth() -> anyhow::Result<()> {
    let (listener, port) = bind().await;
    let challenge = [0x5Au8; 16];

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"RFB 003.008\n").await.unwrap();
        assert_eq!(&read_version(&mut socket).await, b"RFB 003.008\n");

        socket.write_all(&[1, 2]).await.unwrap();
        assert_eq!(socket.read_u8().await.unwrap(), 2);
        socket.write_all(&challenge).await.unwrap();
        let mut response = [0u8; 16];
        socket.read_exact(&mut response).await.unwrap();
        socket.write_u32(0).await.unwrap();

        // First bytes of ServerInit.
        socket.write_all(&[0x04, 0x00]).await.unwrap();
        response
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .password("secret")
        .build()?;
    let mut conn = establish(&config).await?;
    assert_eq!(conn.version, NegotiatedVersion::V3_8);
    assert_eq!(conn.security_type, SecurityType::VNC_AUTH);

    let response = server.await?;
    assert_eq!(response, vnc_auth_response(&challenge, Some("secret")));

    let mut next = [0u8; 2];
    conn.input.read_bytes(&mut next).await?;
    assert_eq!(next, [0x04, 0x00]);
    Ok(())
}

#[tokio::test]
async fn test_establish_3_3_none() -> anyhow::Result<()> {
    let (listener, port) = bind().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"RFB 003.003\n").await.unwrap();
        assert_eq!(&read_version(&mut socket).await, b"RFB 003.003\n");
        socket.write_u32(1).await.unwrap();
        // Hold the socket until the client hangs up.
        let mut rest = Vec::new();
        let _ = socket.read_to_end(&mut rest).await;
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .security_types([SecurityTypeName::None])
        .build()?;
    let conn = establish(&config).await?;
    assert_eq!(conn.version, NegotiatedVersion::V3_3);
    assert_eq!(conn.security_type, SecurityType::NONE);

    let debug = format!("{conn:?}");
    assert!(debug.starts_with("Connection {"));
    assert!(debug.contains("version: V3_3"));
    assert!(debug.contains("security_type: SecurityType(1)"));
    Ok(())
}

#[tokio::test]
async fn test_establish_server_refusal_is_fatal() {
    let (listener, port) = bind().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"RFB 003.008\n").await.unwrap();
        read_version(&mut socket).await;
        socket.write_u8(0).await.unwrap();
        let reason = b"Too many connections";
        socket.write_u32(reason.len() as u32).await.unwrap();
        socket.write_all(reason).await.unwrap();
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .build()
        .unwrap();
    let err = establish(&config).await.unwrap_err();
    assert!(err.is_fatal());
    match err {
        RfbClientError::Handshake(HandshakeError::ConnectionRefused { reason }) => {
            assert_eq!(reason, "Too many connections")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_establish_version_override() -> anyhow::Result<()> {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"RFB 003.008\n").await.unwrap();
        let reply = read_version(&mut socket).await;
        socket.write_u32(1).await.unwrap();
        let mut rest = Vec::new();
        let _ = socket.read_to_end(&mut rest).await;
        reply
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .protocol_version(ProtocolVersionSetting::V3_3)
        .build()?;
    let conn = establish(&config).await?;
    assert_eq!(conn.version, NegotiatedVersion::V3_3);
    drop(conn);

    assert_eq!(&server.await?, b"RFB 003.003\n");
    Ok(())
}

#[tokio::test]
async fn test_establish_handshake_timeout() {
    let (listener, port) = bind().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Never send a version; wait for the client to give up.
        let mut rest = Vec::new();
        let _ = socket.read_to_end(&mut rest).await;
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = establish(&config).await.unwrap_err();
    assert!(matches!(err, RfbClientError::Timeout(_)));
    assert!(err.is_retryable());
}
