use crate::account::MailAccountConfig;
use crate::validator::EmailAddress;

use super::DiscoveryError;
use super::dns::{DnsLookup, preferred_mx, preferred_srv};
use super::document::{Document, substitute_placeholders};
use super::http::{ContentType, HttpRequest, HttpTransport};
use super::mozilla::MozillaNotation;
use super::notation::Notation;
use super::options::render_url;
use super::outlook::{OutlookNotation, request_body};
use super::types::DiscoverySource;
use super::Discovery;

/// `Ok(None)` : la source n'avait rien à essayer.
pub(crate) type SourceResult = Result<Option<MailAccountConfig>, DiscoveryError>;

impl<H: HttpTransport, D: DnsLookup> Discovery<H, D> {
    pub(crate) fn run_source(&self, source: DiscoverySource, address: &EmailAddress) -> SourceResult {
        match source {
            DiscoverySource::Ispdb => self.from_ispdb(address).map(Some),
            DiscoverySource::DomainAutoconfig => self
                .from_domain_autoconfig(address, &address.ascii_domain)
                .map(Some),
            DiscoverySource::MxAutoconfig => self.from_mx(address),
            DiscoverySource::Autodiscover => self.from_autodiscover(address),
            DiscoverySource::Heuristic => Ok(None),
        }
    }

    fn from_ispdb(&self, address: &EmailAddress) -> Result<MailAccountConfig, DiscoveryError> {
        let url = render_url(
            &self.options.ispdb_url,
            &address.ascii_domain,
            &address.original,
        );
        self.fetch_mozilla(&url, address)
    }

    fn from_domain_autoconfig(
        &self,
        address: &EmailAddress,
        host: &str,
    ) -> Result<MailAccountConfig, DiscoveryError> {
        let url = render_url(&self.options.autoconfig_url, host, &address.original);
        self.fetch_mozilla(&url, address)
    }

    fn from_mx(&self, address: &EmailAddress) -> SourceResult {
        let records = self.dns.lookup_mx(&address.ascii_domain)?;
        let Some(record) = preferred_mx(&records) else {
            tracing::debug!(domain = %address.ascii_domain, "no MX records");
            return Ok(None);
        };

        let mut last_error = None;
        for host in mx_candidates(&record.exchange) {
            match self.from_domain_autoconfig(address, &host) {
                Ok(config) => return Ok(Some(config)),
                Err(err) => {
                    tracing::debug!(%host, error = %err, "MX-derived autoconfig failed");
                    last_error = Some(err);
                }
            }
        }
        last_error.map_or(Ok(None), Err)
    }

    fn from_autodiscover(&self, address: &EmailAddress) -> SourceResult {
        let body = request_body(&address.original);
        let mut last_error = None;

        for url in self.autodiscover_urls(address) {
            let request = HttpRequest::post(url.as_str(), body.as_str())
                .with_content_type(ContentType::Xml);
            let response = match self.http.send(&request) {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(%url, error = %err, "autodiscover request failed");
                    last_error = Some(err);
                    continue;
                }
            };
            if response.status != 200 {
                tracing::debug!(%url, status = response.status, "autodiscover endpoint declined");
                last_error = Some(DiscoveryError::HttpStatus {
                    url,
                    status: response.status,
                });
                continue;
            }

            let raw = substitute_placeholders(&response.text(), &address.original, &address.local);
            let document = Document::parse(&raw)?;
            return OutlookNotation
                .normalize(&document, self.options.preferred_incoming())
                .map(Some);
        }
        last_error.map_or(Ok(None), Err)
    }

    /// URL issue du SRV d'abord, puis les templates configurés.
    fn autodiscover_urls(&self, address: &EmailAddress) -> Vec<String> {
        let domain = &address.ascii_domain;
        let mut urls = Vec::with_capacity(self.options.autodiscover_urls.len() + 1);

        match self
            .dns
            .lookup_srv(&self.options.autodiscover_srv_service, domain)
        {
            Ok(records) => {
                if let Some(record) = preferred_srv(&records) {
                    urls.push(render_url(
                        &self.options.autodiscover_srv_url,
                        &record.target,
                        &address.original,
                    ));
                }
            }
            Err(err) => tracing::debug!(%domain, error = %err, "autodiscover SRV lookup failed"),
        }

        urls.extend(
            self.options
                .autodiscover_urls
                .iter()
                .map(|template| render_url(template, domain, &address.original)),
        );
        urls
    }

    fn fetch_mozilla(
        &self,
        url: &str,
        address: &EmailAddress,
    ) -> Result<MailAccountConfig, DiscoveryError> {
        let response = self.http.send(&HttpRequest::get(url))?;
        if !response.is_success() {
            return Err(DiscoveryError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        let raw = substitute_placeholders(&response.text(), &address.original, &address.local);
        let document = Document::parse(&raw)?;
        MozillaNotation.normalize(&document, self.options.preferred_incoming())
    }
}

/// Hôtes à réessayer pour une cible MX : la cible elle-même, puis ce qui
/// suit la première occurrence de `mail.` (ou à défaut `mx.`), où qu'elle
/// soit dans le nom.
pub(crate) fn mx_candidates(target: &str) -> Vec<String> {
    let raw = target.trim().trim_end_matches('.').to_ascii_lowercase();
    let mut candidates = vec![raw.clone()];

    let stripped = strip_after(&raw, "mail.").or_else(|| strip_after(&raw, "mx."));
    if let Some(stripped) = stripped {
        if stripped.contains('.') && stripped != raw {
            candidates.push(stripped.to_string());
        }
    }
    candidates
}

fn strip_after<'a>(host: &'a str, infix: &str) -> Option<&'a str> {
    host.find(infix).map(|idx| &host[idx + infix.len()..])
}
