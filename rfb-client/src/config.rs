//! Configuration types for the RFB client.
//!
//! Configurations can be built in code with [`Config::builder`] or loaded
//! from TOML:
//!
//! ```toml
//! [connection]
//! host = "localhost"
//! port = 5900
//! password = "secret"
//!
//! [security]
//! security_types = ["vnc", "none"]
//! protocol_version = "3.8"
//!
//! [logging]
//! handshake_level = "debug"
//! ```

use crate::errors::RfbClientError;
use rfb_protocol::{
    AuthConfig, HandshakeConfig, NegotiatedVersion, NoAuth, SelectionPolicy, VncAuth,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Complete RFB client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Security settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    pub port: u16,
    /// VNC password (if required).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Timeout for connecting and for the whole handshake, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Security type names accepted in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityTypeName {
    /// Security type 1, no authentication.
    None,
    /// Security type 2, VNC password authentication.
    Vnc,
}

/// Protocol versions accepted as an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersionSetting {
    /// Force RFB 3.3.
    #[serde(rename = "3.3")]
    V3_3,
    /// Force RFB 3.8.
    #[serde(rename = "3.8")]
    V3_8,
}

impl From<ProtocolVersionSetting> for NegotiatedVersion {
    fn from(setting: ProtocolVersionSetting) -> Self {
        match setting {
            ProtocolVersionSetting::V3_3 => NegotiatedVersion::V3_3,
            ProtocolVersionSetting::V3_8 => NegotiatedVersion::V3_8,
        }
    }
}

/// Whose preference order decides among offered security types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSetting {
    /// First server-offered type the client supports.
    #[default]
    Server,
    /// First configured type the server offers.
    Client,
}

/// Security configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Security types this client may use, in registration order.
    #[serde(default = "default_security_types")]
    pub security_types: Vec<SecurityTypeName>,
    /// Force a protocol version instead of deriving it from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<ProtocolVersionSetting>,
    /// Security type selection order.
    #[serde(default)]
    pub selection: SelectionSetting,
}

fn default_security_types() -> Vec<SecurityTypeName> {
    vec![SecurityTypeName::Vnc, SecurityTypeName::None]
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            security_types: default_security_types(),
            protocol_version: None,
            selection: SelectionSetting::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level handshake progress is reported at.
    #[serde(default = "default_handshake_level")]
    pub handshake_level: String,
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_handshake_level() -> String {
    "debug".to_string()
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            handshake_level: default_handshake_level(),
            filter: default_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                host: String::new(),
                port: 5900,
                password: None,
                timeout_ms: default_timeout_ms(),
            },
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(s: &str) -> Result<Self, RfbClientError> {
        let config: Config =
            toml::from_str(s).map_err(|e| RfbClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RfbClientError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RfbClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RfbClientError> {
        if self.connection.host.is_empty() {
            return Err(RfbClientError::Config("Host cannot be empty".to_string()));
        }

        if self.connection.port == 0 {
            return Err(RfbClientError::Config("Port cannot be 0".to_string()));
        }

        if self.connection.timeout_ms == 0 {
            return Err(RfbClientError::Config("Timeout cannot be 0".to_string()));
        }

        if self.security.security_types.is_empty() {
            return Err(RfbClientError::Config(
                "At least one security type must be specified".to_string(),
            ));
        }

        self.handshake_level()?;

        Ok(())
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }

    /// Returns the level handshake progress is logged at.
    pub fn handshake_level(&self) -> Result<Level, RfbClientError> {
        self.logging.handshake_level.parse().map_err(|_| {
            RfbClientError::Config(format!(
                "Invalid handshake log level: {}",
                self.logging.handshake_level
            ))
        })
    }

    /// Builds the handshake configuration for this client.
    #[must_use]
    pub fn handshake_config(&self) -> HandshakeConfig {
        let mut auth = AuthConfig::new();
        for name in &self.security.security_types {
            auth = match name {
                SecurityTypeName::None => auth.with_mechanism(NoAuth),
                SecurityTypeName::Vnc => auth.with_mechanism(VncAuth),
            };
        }
        if let Some(password) = &self.connection.password {
            auth = auth.with_password(password.clone());
        }
        auth = auth.with_selection_policy(match self.security.selection {
            SelectionSetting::Server => SelectionPolicy::ServerPreference,
            SelectionSetting::Client => SelectionPolicy::ClientPreference,
        });

        HandshakeConfig {
            auth,
            version_override: self.security.protocol_version.map(NegotiatedVersion::from),
        }
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the server hostname or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the VNC password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Sets the connection/handshake timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.connection.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the security types this client may use.
    #[must_use]
    pub fn security_types(mut self, types: impl IntoIterator<Item = SecurityTypeName>) -> Self {
        self.config.security.security_types = types.into_iter().collect();
        self
    }

    /// Sets whose preference order picks among offered security types.
    #[must_use]
    pub fn selection(mut self, selection: SelectionSetting) -> Self {
        self.config.security.selection = selection;
        self
    }

    /// Forces a protocol version.
    #[must_use]
    pub fn protocol_version(mut self, version: ProtocolVersionSetting) -> Self {
        self.config.security.protocol_version = Some(version);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, RfbClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
