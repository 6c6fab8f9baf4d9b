//! Security types and authentication mechanisms (RFC 6143 §7.1.2, §7.2).
//!
//! A [`SecurityMechanism`] is the unit of extensibility: it names the security
//! type code it answers to and runs its own sub-handshake over the transport.
//! Two mechanisms are built in:
//!
//! - [`NoAuth`] - security type 1, no sub-handshake
//! - [`VncAuth`] - security type 2, DES challenge/response
//!
//! Clients list the mechanisms they are willing to use in an [`AuthConfig`].
//! Adding a new mechanism means implementing the trait and registering an
//! instance there; nothing else in the handshake changes.

use crate::io::HandshakeTransport;
use async_trait::async_trait;
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;
use std::fmt;
use std::sync::Arc;

/// Length of the VNC authentication challenge and response.
pub const VNC_CHALLENGE_LEN: usize = 16;

/// An RFB security type code from the RFC 6143 registry.
///
/// Codes this crate does not know are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecurityType(pub u8);

impl SecurityType {
    /// Connection failed; a reason string follows.
    pub const INVALID: Self = Self(0);
    /// No authentication.
    pub const NONE: Self = Self(1);
    /// VNC challenge/response authentication.
    pub const VNC_AUTH: Self = Self(2);

    /// The wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Registry name for codes this crate knows.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("Invalid"),
            1 => Some("None"),
            2 => Some("VncAuth"),
            _ => None,
        }
    }
}

impl From<u8> for SecurityType {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "Unknown({})", self.0),
        }
    }
}

/// An authentication mechanism selectable during security negotiation.
#[async_trait]
pub trait SecurityMechanism: fmt::Debug + Send + Sync {
    /// The security type code this mechanism implements. Must not perform I/O.
    fn security_type(&self) -> SecurityType;

    /// Run the mechanism's sub-handshake.
    ///
    /// `password` is the pre-shared secret from [`AuthConfig`], if any.
    /// Mechanism-specific failures should be reported as `io::Error`s
    /// (`io::Error::other` for non-I/O causes).
    async fn authenticate(
        &self,
        transport: &mut dyn HandshakeTransport,
        password: Option<&str>,
    ) -> std::io::Result<()>;
}

/// Security type 1: no authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl SecurityMechanism for NoAuth {
    fn security_type(&self) -> SecurityType {
        SecurityType::NONE
    }

    async fn authenticate(
        &self,
        _transport: &mut dyn HandshakeTransport,
        _password: Option<&str>,
    ) -> std::io::Result<()> {
        Ok(())
    }
}

/// Security type 2: VNC authentication.
///
/// The server sends a 16-byte random challenge; the client answers with the
/// challenge DES-encrypted (two independent 8-byte blocks) under a key
/// derived from the password. A missing password is not an error here: the
/// all-zero key is used and the server's SecurityResult decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct VncAuth;

#[async_trait]
impl SecurityMechanism for VncAuth {
    fn security_type(&self) -> SecurityType {
        SecurityType::VNC_AUTH
    }

    async fn authenticate(
        &self,
        transport: &mut dyn HandshakeTransport,
        password: Option<&str>,
    ) -> std::io::Result<()> {
        let mut challenge = [0u8; VNC_CHALLENGE_LEN];
        transport.read_exact(&mut challenge).await?;

        let response = vnc_auth_response(&challenge, password);
        transport.write_all(&response).await
    }
}

/// Derive the DES key VNC authentication uses.
///
/// Takes the first 8 bytes of the password (zero-padded when shorter) and
/// reverses the bit order of each byte.
#[must_use]
pub fn vnc_des_key(password: Option<&str>) -> [u8; 8] {
    let mut key = [0u8; 8];
    let bytes = password.unwrap_or_default().as_bytes();
    for (slot, &b) in key.iter_mut().zip(bytes) {
        *slot = b.reverse_bits();
    }
    key
}

/// Compute the VNC authentication response for `challenge`.
#[must_use]
pub fn vnc_auth_response(
    challenge: &[u8; VNC_CHALLENGE_LEN],
    password: Option<&str>,
) -> [u8; VNC_CHALLENGE_LEN] {
    let cipher = Des::new(&GenericArray::from(vnc_des_key(password)));

    let mut response = *challenge;
    for block in response.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    response
}

/// How the client picks among the security types an RFB 3.8 server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Walk the server's list in order; the first type the client has
    /// configured wins.
    #[default]
    ServerPreference,
    /// Walk the client's configured list in order; the first mechanism the
    /// server offered wins.
    ClientPreference,
}

/// Selection policy used unless the client configures otherwise.
pub const DEFAULT_SELECTION_POLICY: SelectionPolicy = SelectionPolicy::ServerPreference;

/// The client's authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    mechanisms: Vec<Arc<dyn SecurityMechanism>>,
    password: Option<String>,
    selection: SelectionPolicy,
}

impl AuthConfig {
    /// An empty configuration: no mechanisms, no password.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mechanisms: Vec::new(),
            password: None,
            selection: DEFAULT_SELECTION_POLICY,
        }
    }

    /// Both built-in mechanisms, VNC authentication first.
    #[must_use]
    pub fn standard() -> Self {
        Self::new().with_mechanism(VncAuth).with_mechanism(NoAuth)
    }

    /// Register a mechanism at the end of the configured list.
    #[must_use]
    pub fn with_mechanism(mut self, mechanism: impl SecurityMechanism + 'static) -> Self {
        self.mechanisms.push(Arc::new(mechanism));
        self
    }

    /// Set the pre-shared secret.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Override the selection policy.
    #[must_use]
    pub fn with_selection_policy(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Configured mechanisms in registration order.
    pub fn mechanisms(&self) -> &[Arc<dyn SecurityMechanism>] {
        &self.mechanisms
    }

    /// The pre-shared secret, if configured.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The selection policy in effect.
    pub fn selection(&self) -> SelectionPolicy {
        self.selection
    }

    /// Whether a mechanism for `security_type` is configured.
    pub fn supports(&self, security_type: SecurityType) -> bool {
        self.find(security_type).is_some()
    }

    fn find(&self, security_type: SecurityType) -> Option<&Arc<dyn SecurityMechanism>> {
        self.mechanisms
            .iter()
            .find(|m| m.security_type() == security_type)
    }

    /// Pick a mechanism for the server's `offered` list per the selection policy.
    pub fn select(&self, offered: &[SecurityType]) -> Option<Arc<dyn SecurityMechanism>> {
        match self.selection {
            SelectionPolicy::ServerPreference => offered
                .iter()
                .find_map(|&code| self.find(code))
                .cloned(),
            SelectionPolicy::ClientPreference => self
                .mechanisms
                .iter()
                .find(|m| offered.contains(&m.security_type()))
                .cloned(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mechanisms", &self.mechanisms)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("selection", &self.selection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RfbStream;
    use std::io::Cursor;

    #[test]
    fn test_security_type_display() {
        assert_eq!(SecurityType::NONE.to_string(), "None(1)");
        assert_eq!(SecurityType::VNC_AUTH.to_string(), "VncAuth(2)");
        assert_eq!(SecurityType(19).to_string(), "Unknown(19)");
    }

    #[test]
    fn test_des_key_bit_reversal() {
        // 'p' = 0b0111_0000 reversed is 0b0000_1110
        let key = vnc_des_key(Some("p"));
        assert_eq!(key, [0x0E, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_des_key_truncates_long_passwords() {
        assert_eq!(vnc_des_key(Some("abcdefghij")), vnc_des_key(Some("abcdefgh")));
        assert_ne!(vnc_des_key(Some("abcdefg")), vnc_des_key(Some("abcdefgh")));
    }

    #[test]
    fn test_des_key_empty_password_is_zero() {
        assert_eq!(vnc_des_key(None), [0u8; 8]);
        assert_eq!(vnc_des_key(Some("")), [0u8; 8]);
    }

    #[test]
    fn test_vnc_response_known_answer() {
        // DES with the all-zero key over an all-zero block.
        let expected_block = [0x8C, 0xA6, 0x4D, 0xE9, 0xC1, 0xB1, 0x23, 0xA7];
        let response = vnc_auth_response(&[0u8; 16], None);
        assert_eq!(response[..8], expected_block);
        assert_eq!(response[8..], expected_block);
    }

    #[test]
    fn test_vnc_response_blocks_are_independent() {
        let mut challenge = [0u8; 16];
        challenge[..8].copy_from_slice(b"abcdefgh");
        challenge[8..].copy_from_slice(b"abcdefgh");
        let response = vnc_auth_response(&challenge, Some("secret"));
        assert_eq!(response[..8], response[8..]);
        assert_ne!(response[..8], challenge[..8]);
    }

    #[tokio::test]
    async fn test_vnc_auth_writes_response() {
        let challenge: Vec<u8> = (0u8..16).collect();
        let mut written = Vec::new();
        {
            let mut stream = RfbStream::new(Cursor::new(challenge.clone()), &mut written);
            VncAuth.authenticate(&mut stream, Some("pass")).await.unwrap();
        }
        let mut expected = [0u8; 16];
        expected.copy_from_slice(&challenge);
        assert_eq!(written, vnc_auth_response(&expected, Some("pass")).to_vec());
    }

    #[tokio::test]
    async fn test_vnc_auth_short_challenge_fails() {
        let mut stream = RfbStream::new(Cursor::new(vec![0u8; 10]), Vec::new());
        let err = VncAuth.authenticate(&mut stream, None).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_server_preference_selection() {
        let config = AuthConfig::new().with_mechanism(NoAuth).with_mechanism(VncAuth);
        let offered = [SecurityType(19), SecurityType::VNC_AUTH, SecurityType::NONE];
        let chosen = config.select(&offered).unwrap();
        assert_eq!(chosen.security_type(), SecurityType::VNC_AUTH);
    }

    #[test]
    fn test_client_preference_selection() {
        let config = AuthConfig::new()
            .with_mechanism(NoAuth)
            .with_mechanism(VncAuth)
            .with_selection_policy(SelectionPolicy::ClientPreference);
        let offered = [SecurityType::VNC_AUTH, SecurityType::NONE];
        let chosen = config.select(&offered).unwrap();
        assert_eq!(chosen.security_type(), SecurityType::NONE);
    }

    #[test]
    fn test_default_policy_is_server_preference() {
        assert_eq!(DEFAULT_SELECTION_POLICY, SelectionPolicy::ServerPreference);
        assert_eq!(AuthConfig::new().selection(), SelectionPolicy::ServerPreference);
    }

    #[test]
    fn test_no_overlap_selects_nothing() {
        let config = AuthConfig::standard();
        assert!(config.select(&[SecurityType(5), SecurityType(6)]).is_none());
        assert!(config.supports(SecurityType::NONE));
        assert!(!config.supports(SecurityType(5)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = AuthConfig::standard().with_password("hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
