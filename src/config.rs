//! Server configuration
//!
//! Loaded from a TOML file; every section has defaults so an empty file
//! (or no file at all) yields a runnable plaintext server.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::types::IdentityMode;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// TLS settings; plaintext when absent
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        self.limits.validate()
    }
}

/// Network listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:3334")
    #[serde(default = "default_address")]
    pub address: SocketAddr,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3334))
}

/// Client certificate authentication mode
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuth {
    /// No client certificate requested
    #[default]
    None,
    /// Client certificate verified if presented
    Optional,
    /// Connection rejected without a valid client certificate
    Required,
}

/// TLS listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM)
    pub cert_path: String,
    /// Path to PKCS#8 private key (PEM)
    pub key_path: String,
    /// Client certificate verification mode
    #[serde(default)]
    pub client_auth: ClientAuth,
    /// CA bundle for client verification (PEM).
    /// Required if client_auth is "optional" or "required".
    pub ca_path: Option<String>,
}

/// Queue sizes and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Capacity of the worker → server command channel
    pub command_queue: usize,
    /// Per-connection outbound line queue; lines past capacity are dropped
    pub outbound_queue: usize,
    /// Upper bound on a single socket write, in milliseconds
    pub write_timeout_ms: u64,
    /// Longest accepted input line, in bytes
    pub max_line_length: usize,
}

impl LimitsConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Queue capacities and the line limit must be non-zero
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            ("command_queue", self.command_queue),
            ("outbound_queue", self.outbound_queue),
            ("max_line_length", self.max_line_length),
        ];
        match fields.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(AppError::InvalidConfig(format!(
                "limits.{name} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            command_queue: 256,
            outbound_queue: 64,
            write_timeout_ms: 5000,
            max_line_length: 4096,
        }
    }
}

/// How connection identities are derived
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub mode: IdentityMode,
}
