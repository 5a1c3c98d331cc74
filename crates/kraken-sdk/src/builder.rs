//! Open orders builder
//!
//! Collects the options needed to open the private `openOrders` channel,
//! resolves authentication once, connects through a [`ChannelConnector`] and
//! starts an [`OpenOrdersStream`].
//!
//! # Example
//!
//! ```
//! use kraken_sdk::builder::OpenOrdersBuilder;
//! use std::time::Duration;
//!
//! let builder = OpenOrdersBuilder::new()
//!     .with_token("ws-token")
//!     .with_connect_timeout(Duration::from_secs(5));
//!
//! assert!(builder.validate().is_ok());
//! ```

use async_trait::async_trait;
use kraken_auth::{AuthConfig, AuthError, ChannelAuth, Credentials};
use kraken_types::OPEN_ORDERS_CHANNEL;
use kraken_ws::{Channel, OpenOrdersStream, TransportError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Opens private channels
///
/// Implemented by whatever owns the authenticated socket: it turns a
/// channel name and resolved authentication into a live [`Channel`].
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Channel type produced by this connector
    type Channel: Channel + 'static;

    /// Subscribe to `channel_name` using `auth`
    async fn connect(
        &self,
        channel_name: &str,
        auth: ChannelAuth,
    ) -> Result<Self::Channel, TransportError>;
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Empty channel name
    #[error("channel name must not be empty")]
    EmptyChannelName,

    /// Timeout too short
    #[error("connection timeout must be at least 1 second")]
    TimeoutTooShort,
}

/// Errors while starting an open orders stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// Invalid builder configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No usable authentication
    #[error("authentication: {0}")]
    Auth(#[from] AuthError),

    /// Connecting the channel failed
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// Builder for an [`OpenOrdersStream`]
///
/// Authentication precedence: explicit token, then explicit credentials,
/// then the default credentials.
#[derive(Debug)]
pub struct OpenOrdersBuilder {
    /// Explicit token and/or credentials
    pub auth: AuthConfig,

    /// Fallback credentials
    pub default_credentials: Option<Credentials>,

    /// Private channel to subscribe to
    pub channel_name: String,

    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for OpenOrdersBuilder {
    fn default() -> Self {
        Self {
            auth: AuthConfig::new(),
            default_credentials: None,
            channel_name: OPEN_ORDERS_CHANNEL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl OpenOrdersBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a ready-made WebSocket token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = self.auth.with_token(token);
        self
    }

    /// Use explicit credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.auth = self.auth.with_credentials(credentials);
        self
    }

    /// Set the fallback credentials
    pub fn with_default_credentials(mut self, credentials: Credentials) -> Self {
        self.default_credentials = Some(credentials);
        self
    }

    /// Use `KRAKEN_API_KEY` / `KRAKEN_PRIVATE_KEY` as the fallback, if set
    pub fn with_env_defaults(mut self) -> Self {
        match Credentials::from_env() {
            Ok(credentials) => self.default_credentials = Some(credentials),
            Err(e) => debug!(error = %e, "No default credentials in environment"),
        }
        self
    }

    /// Override the channel name
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_name.trim().is_empty() {
            return Err(ConfigError::EmptyChannelName);
        }
        if self.connect_timeout < Duration::from_secs(1) {
            return Err(ConfigError::TimeoutTooShort);
        }
        Ok(())
    }

    /// Connect the channel and start reconciling
    #[instrument(skip(self, connector), fields(channel = %self.channel_name))]
    pub async fn connect<C: ChannelConnector>(
        self,
        connector: &C,
    ) -> Result<OpenOrdersStream, SetupError> {
        self.validate()?;
        let auth = self.auth.resolve(self.default_credentials)?;

        let channel = timeout(
            self.connect_timeout,
            connector.connect(&self.channel_name, auth),
        )
        .await
        .map_err(|_| {
            warn!("Timed out opening private channel");
            TransportError::Timeout(self.connect_timeout)
        })??;

        info!("Private channel connected");
        Ok(OpenOrdersStream::spawn(channel))
    }
}
