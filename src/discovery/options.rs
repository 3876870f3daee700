use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::account::{AuthMode, Encryption, Role};

use super::types::DiscoverySource;

pub const ISPDB_URL: &str = "https://autoconfig.thunderbird.net/v1.1/{domain}";
pub const AUTOCONFIG_URL: &str =
    "https://autoconfig.{domain}/mail/config-v1.1.xml?emailaddress={email}";
pub const AUTODISCOVER_BASE_URL: &str = "https://{domain}/Autodiscover/Autodiscover.xml";
pub const AUTODISCOVER_SUBDOMAIN_URL: &str =
    "https://autodiscover.{domain}/Autodiscover/Autodiscover.xml";
pub const AUTODISCOVER_SRV_SERVICE: &str = "_autodiscover._tcp";

/// Settings used by the heuristic fallback.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicDefaults {
    pub incoming_port: u16,
    pub outgoing_port: u16,
    pub encryption: Encryption,
    pub auth_mode: AuthMode,
}

impl Default for HeuristicDefaults {
    fn default() -> Self {
        Self {
            incoming_port: 993,
            outgoing_port: 993,
            encryption: Encryption::Ssl,
            auth_mode: AuthMode::Plaintext,
        }
    }
}

/// Configuration knobs for [`Discovery`](super::Discovery).
///
/// URL templates understand two placeholders: `{domain}` (ASCII domain or
/// derived host) and `{email}` (form-url-encoded address).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub preferred_role: Role,
    pub ispdb_url: String,
    pub autoconfig_url: String,
    pub autodiscover_urls: Vec<String>,
    /// Template applied to the SRV target host.
    pub autodiscover_srv_url: String,
    pub autodiscover_srv_service: String,
    /// Networked sources, in priority order. The heuristic always runs last.
    pub sources: Vec<DiscoverySource>,
    pub connect_timeout: Duration,
    pub request_timeout: Option<Duration>,
    pub heuristic: HeuristicDefaults,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            preferred_role: Role::Imap,
            ispdb_url: ISPDB_URL.to_string(),
            autoconfig_url: AUTOCONFIG_URL.to_string(),
            autodiscover_urls: vec![
                AUTODISCOVER_BASE_URL.to_string(),
                AUTODISCOVER_SUBDOMAIN_URL.to_string(),
            ],
            autodiscover_srv_url: AUTODISCOVER_BASE_URL.to_string(),
            autodiscover_srv_service: AUTODISCOVER_SRV_SERVICE.to_string(),
            sources: DiscoverySource::NETWORKED.to_vec(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Some(Duration::from_secs(60)),
            heuristic: HeuristicDefaults::default(),
        }
    }
}

impl DiscoveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferred_role(mut self, role: Role) -> Self {
        self.preferred_role = role;
        self
    }

    pub fn with_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = DiscoverySource>,
    {
        self.sources = sources
            .into_iter()
            .filter(|source| *source != DiscoverySource::Heuristic)
            .collect();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Preferred incoming role; an SMTP preference degrades to IMAP.
    pub fn preferred_incoming(&self) -> Role {
        if self.preferred_role.is_incoming() {
            self.preferred_role
        } else {
            Role::Imap
        }
    }
}

pub(crate) fn render_url(template: &str, domain: &str, email: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
    template
        .replace("{domain}", domain)
        .replace("{email}", &encoded)
}
