//! Mail account autodiscovery.
//!
//! [`Discovery`] walks a fallback chain of provider sources (hosted ISPDB,
//! domain autoconfig, MX-derived autoconfig, Outlook autodiscover) and ends
//! with a heuristic guess, so a syntactically valid address always yields a
//! configuration. The top-level [`discover`] wires the chain to the system
//! resolver and a blocking `reqwest` client.

mod dns;
mod document;
mod error;
mod guess;
mod http;
mod mozilla;
mod notation;
mod options;
mod outlook;
mod sources;
mod types;

pub use dns::{DnsLookup, MxRecord, SrvRecord, SystemDns};
pub use document::{Document, Element};
pub use error::DiscoveryError;
pub use guess::guess_config;
pub use http::{ContentType, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use mozilla::MozillaNotation;
pub use notation::Notation;
pub use options::{
    AUTOCONFIG_URL, AUTODISCOVER_BASE_URL, AUTODISCOVER_SRV_SERVICE, AUTODISCOVER_SUBDOMAIN_URL,
    DiscoveryOptions, HeuristicDefaults, ISPDB_URL,
};
pub use outlook::OutlookNotation;
pub use types::{AttemptOutcome, DiscoveryReport, DiscoverySource, SourceAttempt};

use crate::account::MailAccountConfig;
use crate::validator::{EmailAddress, parse_address};

/// Discovery resolver over an HTTP transport and a DNS capability.
pub struct Discovery<H, D> {
    http: H,
    dns: D,
    options: DiscoveryOptions,
}

impl<H: HttpTransport, D: DnsLookup> Discovery<H, D> {
    pub fn new(http: H, dns: D, options: DiscoveryOptions) -> Self {
        Self { http, dns, options }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Returns the first configuration produced by the chain.
    ///
    /// Fails only with [`DiscoveryError::InvalidInput`].
    pub fn discover(&self, email: &str) -> Result<MailAccountConfig, DiscoveryError> {
        self.discover_report(email).map(|report| report.config)
    }

    /// Like [`Discovery::discover`], keeping the trail of attempted sources.
    pub fn discover_report(&self, email: &str) -> Result<DiscoveryReport, DiscoveryError> {
        let address = parse_address(email)?;
        let mut attempts = Vec::with_capacity(self.options.sources.len() + 1);

        for &source in &self.options.sources {
            if source == DiscoverySource::Heuristic {
                continue;
            }
            match self.run_source(source, &address) {
                Ok(Some(mut config)) => {
                    config.fill_usernames(&address.original);
                    tracing::info!(email = %address.original, %source, "configuration found");
                    attempts.push(SourceAttempt {
                        source,
                        outcome: AttemptOutcome::Found,
                    });
                    return Ok(DiscoveryReport {
                        email: address.original,
                        source,
                        config,
                        attempts,
                    });
                }
                Ok(None) => {
                    tracing::debug!(%source, "source had nothing to try");
                    attempts.push(SourceAttempt {
                        source,
                        outcome: AttemptOutcome::NotFound,
                    });
                }
                Err(err) => {
                    tracing::debug!(%source, error = %err, "source failed");
                    attempts.push(SourceAttempt {
                        source,
                        outcome: AttemptOutcome::Failed(err.to_string()),
                    });
                }
            }
        }

        heuristic_report(address, &self.options, attempts)
    }
}

/// Discovers `email` with default options.
pub fn discover(email: &str) -> Result<MailAccountConfig, DiscoveryError> {
    discover_with_options(email, DiscoveryOptions::default()).map(|report| report.config)
}

/// Runs the full chain against the system resolver and a `reqwest` client.
///
/// When the HTTP client cannot be built the heuristic result is returned.
pub fn discover_with_options(
    email: &str,
    options: DiscoveryOptions,
) -> Result<DiscoveryReport, DiscoveryError> {
    match ReqwestTransport::new(options.connect_timeout, options.request_timeout) {
        Ok(http) => Discovery::new(http, SystemDns::from_system_conf(), options).discover_report(email),
        Err(err) => {
            tracing::warn!(error = %err, "HTTP client unavailable, using heuristic only");
            let address = parse_address(email)?;
            heuristic_report(address, &options, Vec::new())
        }
    }
}

fn heuristic_report(
    address: EmailAddress,
    options: &DiscoveryOptions,
    mut attempts: Vec<SourceAttempt>,
) -> Result<DiscoveryReport, DiscoveryError> {
    let config = guess_config(&address, options.preferred_incoming(), &options.heuristic)?;
    tracing::info!(email = %address.original, "falling back to heuristic configuration");
    attempts.push(SourceAttempt {
        source: DiscoverySource::Heuristic,
        outcome: AttemptOutcome::Found,
    });
    Ok(DiscoveryReport {
        email: address.original,
        source: DiscoverySource::Heuristic,
        config,
        attempts,
    })
}
