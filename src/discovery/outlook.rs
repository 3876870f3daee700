//! Microsoft Autodiscover schema (`Autodiscover/Response/Account/Protocol`).

use crate::account::{AuthMode, Encryption, MailAccountConfig, Role};

use super::DiscoveryError;
use super::document::{Document, Element};
use super::notation::{IncomingServers, Notation, ServerFields};

/// Fixed POX request body sent to autodiscover endpoints.
pub(crate) fn request_body(email: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            "<Autodiscover><Request><EMailAddress>{}</EMailAddress>",
            "<AcceptableResponseSchema/></Request></Autodiscover>"
        ),
        quick_xml::escape::escape(email)
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutlookNotation;

impl Notation for OutlookNotation {
    fn name(&self) -> &'static str {
        "outlook"
    }

    fn normalize(
        &self,
        document: &Document,
        preferred: Role,
    ) -> Result<MailAccountConfig, DiscoveryError> {
        let response = document
            .root()
            .child("Response")
            .ok_or_else(|| DiscoveryError::malformed("missing Response element"))?;
        let display_name = response
            .path("User/DisplayName")
            .map(|node| node.text.trim())
            .unwrap_or("");

        let mut outgoing = None;
        let mut incoming = IncomingServers::default();
        let protocols = response
            .child("Account")
            .into_iter()
            .flat_map(|account| account.children("Protocol"));
        for protocol in protocols {
            let kind = protocol.child_text("Type").to_ascii_lowercase();
            let role = match kind.as_str() {
                "imap" => Role::Imap,
                "pop3" => Role::Pop3,
                "smtp" => Role::Smtp,
                _ => continue,
            };
            let Some(server) = fields(protocol, role).build(self.name()) else {
                continue;
            };
            if role == Role::Smtp {
                outgoing = Some(server);
            } else {
                incoming.insert(server);
            }
        }

        let outgoing = outgoing.ok_or_else(DiscoveryError::missing_outgoing)?;
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

fn fields(protocol: &Element, role: Role) -> ServerFields<'_> {
    ServerFields {
        role,
        host: protocol.child_text("Server"),
        port: protocol.child_text("Port"),
        encryption: if is_on(protocol.child_text("SSL")) {
            Encryption::Ssl
        } else {
            Encryption::None
        },
        auth_mode: if is_on(protocol.child_text("SPA")) {
            AuthMode::Encrypted
        } else {
            AuthMode::Plaintext
        },
        username: protocol.child_text("LoginName"),
    }
}

fn is_on(value: &str) -> bool {
    value.eq_ignore_ascii_case("on")
}
