use thiserror::Error;

use super::Role;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid {role} server: {reason}")]
    InvalidServer { role: Role, reason: String },
    #[error("{role} server cannot be used as the {slot} endpoint")]
    RoleMismatch { slot: &'static str, role: Role },
    #[error("unknown server type '{0}', use: imap|pop3|smtp")]
    UnknownRole(String),
}

impl AccountError {
    pub(crate) fn invalid_server(role: Role, reason: impl Into<String>) -> Self {
        Self::InvalidServer {
            role,
            reason: reason.into(),
        }
    }
}
