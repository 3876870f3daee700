use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::account::MailAccountConfig;

/// One strategy of the fallback chain.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoverySource {
    /// Hosted Thunderbird ISPDB.
    Ispdb,
    /// `autoconfig.{domain}` document.
    DomainAutoconfig,
    /// Autoconfig retried against the preferred MX host.
    MxAutoconfig,
    /// Outlook-style autodiscover POST.
    Autodiscover,
    /// Terminal best guess, no I/O.
    Heuristic,
}

impl DiscoverySource {
    /// Default networked order.
    pub const NETWORKED: [DiscoverySource; 4] = [
        Self::Ispdb,
        Self::DomainAutoconfig,
        Self::MxAutoconfig,
        Self::Autodiscover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ispdb => "ispdb",
            Self::DomainAutoconfig => "domain-autoconfig",
            Self::MxAutoconfig => "mx-autoconfig",
            Self::Autodiscover => "autodiscover",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[cfg_attr(feature = "with-serde", serde(tag = "kind", content = "reason", rename_all = "kebab-case"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Found,
    /// The source had nothing to look at (no MX record, no candidate URL).
    NotFound,
    Failed(String),
}

#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttempt {
    pub source: DiscoverySource,
    pub outcome: AttemptOutcome,
}

/// Result of a discovery run: the winning configuration plus the trail of
/// every source consulted before it.
#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub email: String,
    pub source: DiscoverySource,
    pub config: MailAccountConfig,
    pub attempts: Vec<SourceAttempt>,
}
