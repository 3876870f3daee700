use crate::account::{Role, ServerConfig};

use super::error::VerifyError;
use super::options::VerifyOptions;
use super::probe::{ProtocolProbe, REDACTED, conclude_check, conclude_login, expect};
use super::session::{Framing, Session, imap_ok, imap_tagged_ok};
use super::stream::Connector;

const TAG: &str = "1";

/// Sonde IMAP : salutation, `1 STARTTLS` éventuel, puis `1 LOGIN`.
pub struct ImapProbe<'a, C: Connector> {
    session: Session<'a, C>,
}

impl<'a, C: Connector> ImapProbe<'a, C> {
    pub fn new(connector: &'a C, server: &ServerConfig, options: &'a VerifyOptions) -> Self {
        Self {
            session: Session::new(connector, server, options),
        }
    }

    fn try_check(&mut self) -> Result<(), VerifyError> {
        let greeting = self.session.open(Framing::ImapGreeting)?;
        expect(imap_ok(&greeting), "greeting")?;
        if self.session.wants_starttls() {
            let reply = self.session.command("1 STARTTLS", Framing::ImapTagged)?;
            expect(imap_tagged_ok(&reply, TAG), "STARTTLS")?;
            self.session.upgrade()?;
        }
        Ok(())
    }

    fn try_login(&mut self, username: &str, password: &str) -> Result<(), VerifyError> {
        let user = astring(username);
        let reply = self.session.command_redacted(
            &format!("1 LOGIN {user} {}", astring(password)),
            &format!("1 LOGIN {user} {REDACTED}"),
            Framing::ImapTagged,
        )?;
        expect(imap_tagged_ok(&reply, TAG), "LOGIN")
    }
}

impl<C: Connector> ProtocolProbe for ImapProbe<'_, C> {
    fn role(&self) -> Role {
        Role::Imap
    }

    fn check(&mut self) -> bool {
        let outcome = self.try_check();
        conclude_check(&mut self.session, outcome)
    }

    fn authenticate(&mut self, username: &str, password: &str) -> bool {
        let outcome = self.try_login(username, password);
        conclude_login(&mut self.session, outcome)
    }

    fn close(&mut self) {
        self.session.close();
    }

    fn transcript(&self) -> &[String] {
        self.session.transcript()
    }
}

/// Atom si possible, sinon chaîne quotée RFC 3501.
fn astring(value: &str) -> String {
    let is_atom = !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_graphic() && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\')
        });
    if is_atom {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}
