//! Authentication configuration for Kraken private WebSocket channels
//!
//! Private channels need either a WebSocket token or credentials a token can
//! be generated from. This crate holds those secrets and resolves which one a
//! channel should use.
//!
//! # Example
//!
//! ```no_run
//! use kraken_auth::{AuthConfig, Credentials};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Environment credentials are only a fallback
//!     let default = Credentials::from_env().ok();
//!
//!     let auth = AuthConfig::new()
//!         .with_token("token-from-somewhere")
//!         .resolve(default)?;
//!
//!     assert!(auth.token().is_some());
//!     Ok(())
//! }
//! ```

mod config;
mod credentials;
mod error;

pub use config::{AuthConfig, ChannelAuth};
pub use credentials::{Credentials, API_KEY_VAR, PRIVATE_KEY_VAR};
pub use error::{AuthError, AuthResult};
