//! Canonical account/server records shared by discovery and verification.

mod error;
mod types;

pub use error::AccountError;
pub use types::{AuthMode, Encryption, MailAccountConfig, Role, ServerConfig};
