use thiserror::Error;

use crate::account::{AccountError, Role};
use crate::validator::EmailError;

/// Errors raised while discovering a mail account configuration.
///
/// Only [`DiscoveryError::InvalidInput`] ever escapes
/// [`Discovery::discover`](super::Discovery::discover); every other variant is
/// recorded against the failing source and the chain moves on.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid email address: {}", reasons.join("; "))]
    InvalidInput { reasons: Vec<String> },
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("HTTP client initialization failed: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("DNS lookup for {name} failed: {source}")]
    Dns {
        name: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("DNS resolver unavailable: {0}")]
    ResolverUnavailable(String),
    #[error("malformed configuration document: {reason}")]
    MalformedDocument { reason: String },
    #[error("configuration document has no usable {role} server")]
    MissingRequiredServer { role: &'static str },
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl DiscoveryError {
    pub(crate) fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    pub(crate) fn dns(name: impl Into<String>, source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::Dns {
            name: name.into(),
            source,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_incoming() -> Self {
        Self::MissingRequiredServer {
            role: "incoming (imap/pop3)",
        }
    }

    pub(crate) fn missing_outgoing() -> Self {
        Self::MissingRequiredServer {
            role: Role::Smtp.as_str(),
        }
    }
}

impl From<EmailError> for DiscoveryError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidFormat { reasons } => Self::InvalidInput { reasons },
        }
    }
}
