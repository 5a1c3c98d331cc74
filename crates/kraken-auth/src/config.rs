//! Authentication source resolution for private channels
//!
//! A private channel is opened with exactly one of:
//!
//! 1. an explicit WebSocket token (used as-is, no round trip),
//! 2. explicit credentials (a token is generated from them),
//! 3. the default credentials supplied by the caller (usually
//!    [`Credentials::from_env`]).
//!
//! The first available source wins. Resolution happens once, at setup.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};

/// Resolved authentication for a private channel
#[derive(Debug)]
pub enum ChannelAuth {
    /// Ready-made WebSocket token
    Token(SecretString),
    /// Credentials a token must be generated from
    Credentials(Credentials),
}

impl ChannelAuth {
    /// The token, if one was supplied directly
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token.expose_secret()),
            Self::Credentials(_) => None,
        }
    }

    /// The credentials, if a token has to be generated
    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Token(_) => None,
            Self::Credentials(creds) => Some(creds),
        }
    }
}

impl Clone for ChannelAuth {
    fn clone(&self) -> Self {
        match self {
            Self::Token(token) => Self::Token(SecretString::from(token.expose_secret().to_string())),
            Self::Credentials(creds) => Self::Credentials(creds.clone()),
        }
    }
}

/// Caller-supplied authentication options
#[derive(Debug, Default)]
pub struct AuthConfig {
    token: Option<SecretString>,
    credentials: Option<Credentials>,
}

impl AuthConfig {
    /// Empty configuration (falls through to the default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit WebSocket token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Use explicit credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// True if neither a token nor credentials were given
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.credentials.is_none()
    }

    /// Pick the authentication source: token, then credentials, then `default`
    pub fn resolve(self, default: Option<Credentials>) -> AuthResult<ChannelAuth> {
        if let Some(token) = self.token {
            if !token.expose_secret().trim().is_empty() {
                debug!("Using explicit WebSocket token");
                return Ok(ChannelAuth::Token(token));
            }
        }
        if let Some(credentials) = self.credentials {
            debug!("Using explicit credentials");
            return Ok(ChannelAuth::Credentials(credentials));
        }
        match default {
            Some(credentials) => {
                debug!("Using default credentials");
                Ok(ChannelAuth::Credentials(credentials))
            }
            None => Err(AuthError::MissingAuth),
        }
    }
}
