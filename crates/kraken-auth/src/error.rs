//! Error types for authentication configuration

/// Errors that can occur while resolving channel authentication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Invalid API credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Nothing to authenticate with
    #[error("No token or credentials available for private channel")]
    MissingAuth,
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
