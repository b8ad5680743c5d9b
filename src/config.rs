//! Server configuration
//!
//! Configuration is built once at startup (see `main.rs`) and shared
//! read-only by every connection.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Default listen address
pub const DEFAULT_LISTEN_ADDRESS: &str = "localhost:8811";

/// Default per-read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(4000);

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("listen address is empty")]
    EmptyListenAddress,

    #[error("cannot resolve listen address {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("listen address {0} resolves to nothing")]
    NoAddress(String),
}

/// Server configuration (immutable after building)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind, `host:port`
    pub listen_address: String,
    /// Bound on each individual socket read; `None` never times out
    pub read_timeout: Option<Duration>,
    /// Answer malformed requests with 400/431 instead of closing silently
    pub reject_malformed: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            reject_malformed: false,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Resolve the listen address to the first socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.listen_address.trim().is_empty() {
            return Err(ConfigError::EmptyListenAddress);
        }

        self.listen_address
            .to_socket_addrs()
            .map_err(|source| ConfigError::Resolve {
                address: self.listen_address.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ConfigError::NoAddress(self.listen_address.clone()))
    }

    /// Check the configuration can be used to start a server
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr().map(|_| ())
    }
}

/// Server configuration builder
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_address(mut self, address: impl Into<String>) -> Self {
        self.config.listen_address = address.into();
        self
    }

    /// Set the per-read timeout; zero disables it
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Set the per-read timeout in milliseconds; zero disables it
    pub fn read_timeout_millis(self, millis: u64) -> Self {
        self.read_timeout(Duration::from_millis(millis))
    }

    /// Enable or disable 400/431 answers for malformed requests
    pub fn reject_malformed(mut self, reject: bool) -> Self {
        self.config.reject_malformed = reject;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
