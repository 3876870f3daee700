use crate::account::{MailAccountConfig, Role, ServerConfig};
use crate::validator::EmailAddress;

use super::DiscoveryError;
use super::options::HeuristicDefaults;

const FALLBACK_PORT: u16 = 993;

/// Configuration devinée : `{role}.{domain}` en entrée, `smtp.{domain}` en
/// sortie, identifiant = adresse complète.
///
/// L'adresse est déjà validée : seul un hôte impossible fait échouer. Un port
/// nul dans `defaults` devient 993.
pub fn guess_config(
    address: &EmailAddress,
    preferred: Role,
    defaults: &HeuristicDefaults,
) -> Result<MailAccountConfig, DiscoveryError> {
    let incoming_role = if preferred.is_incoming() {
        preferred
    } else {
        Role::Imap
    };
    let incoming = guess_server(address, incoming_role, defaults.incoming_port, defaults)?;
    let outgoing = guess_server(address, Role::Smtp, defaults.outgoing_port, defaults)?;
    Ok(MailAccountConfig::new(None, Some(incoming), Some(outgoing))?)
}

fn guess_server(
    address: &EmailAddress,
    role: Role,
    port: u16,
    defaults: &HeuristicDefaults,
) -> Result<ServerConfig, DiscoveryError> {
    let port = if port == 0 { FALLBACK_PORT } else { port };
    Ok(ServerConfig::new(
        role,
        format!("{}.{}", role.as_str(), address.ascii_domain),
        port,
        defaults.encryption,
        defaults.auth_mode,
        address.original.as_str(),
    )?)
}
