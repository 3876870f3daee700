use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
};

use super::DiscoveryError;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: normalize_host(&exchange.into()),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl SrvRecord {
    pub fn new(priority: u16, weight: u16, port: u16, target: impl Into<String>) -> Self {
        Self {
            priority,
            weight,
            port,
            target: normalize_host(&target.into()),
        }
    }
}

/// MX and SRV lookups. An absent record set is an empty list, not an error.
pub trait DnsLookup {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DiscoveryError>;
    fn lookup_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvRecord>, DiscoveryError>;
}

impl<T: DnsLookup + ?Sized> DnsLookup for &T {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DiscoveryError> {
        (**self).lookup_mx(domain)
    }

    fn lookup_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvRecord>, DiscoveryError> {
        (**self).lookup_srv(service, domain)
    }
}

impl DnsLookup for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DiscoveryError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(DiscoveryError::dns(domain, err)),
        };
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), mx.exchange().to_utf8()))
            .collect())
    }

    fn lookup_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvRecord>, DiscoveryError> {
        let name = srv_name(service, domain);
        let lookup = match Resolver::srv_lookup(self, name.as_str()) {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(DiscoveryError::dns(name, err)),
        };
        Ok(lookup
            .iter()
            .map(|srv| {
                SrvRecord::new(
                    srv.priority(),
                    srv.weight(),
                    srv.port(),
                    srv.target().to_utf8(),
                )
            })
            .collect())
    }
}

/// System resolver that tolerates a failed initialization: lookups then
/// report [`DiscoveryError::ResolverUnavailable`] and the chain moves on.
pub struct SystemDns {
    resolver: Result<Resolver, String>,
}

impl SystemDns {
    pub fn from_system_conf() -> Self {
        let resolver = Resolver::from_system_conf().map_err(|err| {
            tracing::warn!(error = %err, "system DNS resolver unavailable");
            err.to_string()
        });
        Self { resolver }
    }
}

impl DnsLookup for SystemDns {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DiscoveryError> {
        match &self.resolver {
            Ok(resolver) => resolver.lookup_mx(domain),
            Err(reason) => Err(DiscoveryError::ResolverUnavailable(reason.clone())),
        }
    }

    fn lookup_srv(&self, service: &str, domain: &str) -> Result<Vec<SrvRecord>, DiscoveryError> {
        match &self.resolver {
            Ok(resolver) => resolver.lookup_srv(service, domain),
            Err(reason) => Err(DiscoveryError::ResolverUnavailable(reason.clone())),
        }
    }
}

/// Lowest preference wins; equal preferences keep DNS response order.
pub(crate) fn preferred_mx(records: &[MxRecord]) -> Option<&MxRecord> {
    records.iter().min_by_key(|record| record.preference)
}

/// Lowest priority wins; equal priorities keep DNS response order.
pub(crate) fn preferred_srv(records: &[SrvRecord]) -> Option<&SrvRecord> {
    records
        .iter()
        .filter(|record| !record.target.is_empty())
        .min_by_key(|record| record.priority)
}

pub(crate) fn srv_name(service: &str, domain: &str) -> String {
    let service = service.trim().trim_end_matches('.');
    format!("{service}.{domain}")
}

pub(crate) fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn should_treat_as_empty(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_host_trims_dot_and_lowercases() {
        assert_eq!(normalize_host("Mail.EXAMPLE.com."), "mail.example.com");
    }

    #[test]
    fn preferred_mx_keeps_response_order_on_ties() {
        let records = vec![
            MxRecord::new(20, "mx3.example.com"),
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(10, "mx2.example.com"),
        ];
        let best = preferred_mx(&records).expect("record");
        assert_eq!(best.exchange, "mx1.example.com");
        assert!(preferred_mx(&[]).is_none());
    }

    #[test]
    fn preferred_srv_skips_null_target() {
        // "." comme cible : service indisponible (RFC 2782)
        let records = vec![
            SrvRecord::new(0, 0, 443, "."),
            SrvRecord::new(5, 0, 443, "autodiscover.example.net."),
            SrvRecord::new(5, 10, 443, "other.example.net"),
        ];
        let best = preferred_srv(&records).expect("record");
        assert_eq!(best.target, "autodiscover.example.net");
    }

    #[test]
    fn srv_name_joins_labels() {
        assert_eq!(
            srv_name("_autodiscover._tcp.", "example.com"),
            "_autodiscover._tcp.example.com"
        );
    }
}
