use crate::account::{AuthMode, Encryption, MailAccountConfig, Role, ServerConfig};

use super::DiscoveryError;
use super::document::Document;

/// Maps one vendor schema onto [`MailAccountConfig`].
pub trait Notation {
    fn name(&self) -> &'static str;

    fn normalize(
        &self,
        document: &Document,
        preferred: Role,
    ) -> Result<MailAccountConfig, DiscoveryError>;
}

/// Raw server fields pulled from a document before validation.
pub(crate) struct ServerFields<'a> {
    pub role: Role,
    pub host: &'a str,
    pub port: &'a str,
    pub encryption: Encryption,
    pub auth_mode: AuthMode,
    pub username: &'a str,
}

impl ServerFields<'_> {
    /// Construit le serveur, `None` si l'hôte ou le port sont inutilisables.
    pub(crate) fn build(&self, notation: &'static str) -> Option<ServerConfig> {
        let port = match self.port.trim().parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                tracing::debug!(
                    notation,
                    role = %self.role,
                    port = self.port,
                    "skipping server entry with unusable port"
                );
                return None;
            }
        };
        match ServerConfig::new(
            self.role,
            self.host,
            port,
            self.encryption,
            self.auth_mode,
            self.username.trim(),
        ) {
            Ok(server) => Some(server),
            Err(err) => {
                tracing::debug!(notation, error = %err, "skipping server entry");
                None
            }
        }
    }
}

/// Serveurs entrants par rôle. Une entrée ultérieure du même rôle remplace
/// la précédente à sa place.
#[derive(Default)]
pub(crate) struct IncomingServers {
    entries: Vec<ServerConfig>,
}

impl IncomingServers {
    pub(crate) fn insert(&mut self, server: ServerConfig) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.role() == server.role())
        {
            Some(slot) => *slot = server,
            None => self.entries.push(server),
        }
    }

    /// Rôle préféré s'il existe, sinon la première entrée collectée.
    pub(crate) fn select(mut self, preferred: Role) -> Option<ServerConfig> {
        if let Some(index) = self
            .entries
            .iter()
            .position(|server| server.role() == preferred)
        {
            return Some(self.entries.swap_remove(index));
        }
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }
}
