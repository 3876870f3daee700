//! Mozilla autoconfig / ISPDB schema (`clientConfig/emailProvider`).

use crate::account::{AuthMode, Encryption, MailAccountConfig, Role};

use super::DiscoveryError;
use super::document::{Document, Element};
use super::notation::{IncomingServers, Notation, ServerFields};

#[derive(Debug, Clone, Copy, Default)]
pub struct MozillaNotation;

impl Notation for MozillaNotation {
    fn name(&self) -> &'static str {
        "mozilla"
    }

    fn normalize(
        &self,
        document: &Document,
        preferred: Role,
    ) -> Result<MailAccountConfig, DiscoveryError> {
        let provider = document
            .root()
            .child("emailProvider")
            .ok_or_else(|| DiscoveryError::malformed("missing emailProvider element"))?;
        let display_name = provider.child_text("displayName");

        let outgoing = provider
            .children("outgoingServer")
            .filter(|server| server.attr("type") == Some("smtp"))
            .filter_map(|server| fields(server, Role::Smtp).build(self.name()))
            .last()
            .ok_or_else(DiscoveryError::missing_outgoing)?;

        let mut incoming = IncomingServers::default();
        for server in provider.children("incomingServer") {
            let role = match server.attr("type") {
                Some("imap") => Role::Imap,
                Some("pop3") => Role::Pop3,
                _ => continue,
            };
            if let Some(config) = fields(server, role).build(self.name()) {
                incoming.insert(config);
            }
        }
        let incoming = incoming
            .select(preferred)
            .ok_or_else(DiscoveryError::missing_incoming)?;

        Ok(MailAccountConfig::new(
            Some(display_name.to_string()),
            Some(incoming),
            Some(outgoing),
        )?)
    }
}

fn fields(server: &Element, role: Role) -> ServerFields<'_> {
    ServerFields {
        role,
        host: server.child_text("hostname"),
        port: server.child_text("port"),
        encryption: parse_socket_type(server.child_text("socketType")),
        auth_mode: parse_authentication(server.child_text("authentication")),
        username: server.child_text("username"),
    }
}

fn parse_socket_type(value: &str) -> Encryption {
    match value.to_ascii_uppercase().as_str() {
        "SSL" => Encryption::Ssl,
        "STARTTLS" => Encryption::Starttls,
        _ => Encryption::None,
    }
}

fn parse_authentication(value: &str) -> AuthMode {
    if value.eq_ignore_ascii_case("password-encrypted") {
        AuthMode::Encrypted
    } else {
        AuthMode::Plaintext
    }
}
