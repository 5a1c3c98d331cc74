//! API credentials for private channels
//!
//! # Security
//!
//! Private keys are stored using the `secrecy` crate which:
//! - Zeroizes memory on drop (prevents memory scanning)
//! - Prevents accidental logging via Debug impl
//! - Provides explicit access via `expose_secret()`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretBox};

use crate::error::{AuthError, AuthResult};

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "KRAKEN_API_KEY";
/// Environment variable holding the base64 private key
pub const PRIVATE_KEY_VAR: &str = "KRAKEN_PRIVATE_KEY";

/// API credentials used to obtain a channel token
///
/// Private keys are automatically zeroized when the Credentials are dropped,
/// preventing sensitive data from remaining in memory.
pub struct Credentials {
    /// API key (public)
    api_key: String,
    /// Private key (decoded from base64, zeroized on drop)
    private_key: SecretBox<Vec<u8>>,
}

impl Credentials {
    /// Create new credentials from API key and private key
    ///
    /// # Arguments
    /// * `api_key` - Your Kraken API key
    /// * `private_key` - Your private key (base64 encoded string)
    pub fn new(api_key: impl Into<String>, private_key: impl AsRef<str>) -> AuthResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("empty API key".to_string()));
        }

        let decoded = BASE64.decode(private_key.as_ref()).map_err(|e| {
            AuthError::InvalidCredentials(format!("Invalid base64 private key: {}", e))
        })?;

        Ok(Self {
            api_key,
            private_key: SecretBox::new(Box::new(decoded)),
        })
    }

    /// Create credentials from environment variables
    ///
    /// Reads `KRAKEN_API_KEY` and `KRAKEN_PRIVATE_KEY`. Call this once at
    /// setup and pass the result as the default in
    /// [`AuthConfig::resolve`](crate::AuthConfig::resolve).
    pub fn from_env() -> AuthResult<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| AuthError::EnvVarNotSet(API_KEY_VAR.to_string()))?;
        let private_key = std::env::var(PRIVATE_KEY_VAR)
            .map_err(|_| AuthError::EnvVarNotSet(PRIVATE_KEY_VAR.to_string()))?;

        Self::new(api_key, private_key)
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Decoded private key bytes
    pub fn private_key(&self) -> &[u8] {
        self.private_key.expose_secret()
    }
}

impl Clone for Credentials {
    /// Clone credentials (creates new SecretBox with same content)
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            private_key: SecretBox::new(Box::new(self.private_key.expose_secret().clone())),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "api_key",
                &format!("{}...", self.api_key.chars().take(8).collect::<String>()),
            )
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials::new("test_api_key", "dGVzdF9wcml2YXRlX2tleQ==").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("test_private_key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credentials_debug_multibyte_api_key() {
        let creds = Credentials::new("aключ-api-key", "dGVzdA==").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("aключ-ap..."));
    }

    #[test]
    fn test_private_key_decoded() {
        let creds = Credentials::new("test_api_key", "dGVzdF9wcml2YXRlX2tleQ==").unwrap();
        assert_eq!(creds.private_key(), b"test_private_key");
        assert_eq!(creds.clone().private_key(), b"test_private_key");
    }

    #[test]
    fn test_invalid_private_key() {
        let err = Credentials::new("key", "not base64!!").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn test_empty_api_key() {
        let err = Credentials::new("  ", "dGVzdA==").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }
}
