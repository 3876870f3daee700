use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::account::{Role, ServerConfig};

use super::error::VerifyError;
use super::options::VerifyOptions;
use super::probe::{ProtocolProbe, REDACTED, conclude_check, conclude_login, expect};
use super::session::{Framing, Session, smtp_code};
use super::stream::Connector;

/// Sonde SMTP : salutation `220`, `EHLO`, `STARTTLS` éventuel (suivi d'un
/// second `EHLO`), puis `AUTH LOGIN`.
pub struct SmtpProbe<'a, C: Connector> {
    session: Session<'a, C>,
}

impl<'a, C: Connector> SmtpProbe<'a, C> {
    pub fn new(connector: &'a C, server: &ServerConfig, options: &'a VerifyOptions) -> Self {
        Self {
            session: Session::new(connector, server, options),
        }
    }

    fn ehlo(&mut self) -> Result<(), VerifyError> {
        let command = format!("EHLO {}", self.session.options().helo_name());
        let reply = self.session.command(&command, Framing::Smtp)?;
        expect(smtp_code(&reply, 250), "EHLO")
    }

    fn try_check(&mut self) -> Result<(), VerifyError> {
        let greeting = self.session.open(Framing::Smtp)?;
        expect(smtp_code(&greeting, 220), "greeting")?;
        self.ehlo()?;
        if self.session.wants_starttls() {
            let reply = self.session.command("STARTTLS", Framing::Smtp)?;
            expect(smtp_code(&reply, 220), "STARTTLS")?;
            self.session.upgrade()?;
            self.ehlo()?;
        }
        Ok(())
    }

    fn try_login(&mut self, username: &str, password: &str) -> Result<(), VerifyError> {
        let reply = self.session.command("AUTH LOGIN", Framing::Smtp)?;
        expect(smtp_code(&reply, 334), "AUTH LOGIN")?;
        let reply = self
            .session
            .command(&STANDARD.encode(username), Framing::Smtp)?;
        expect(smtp_code(&reply, 334), "username")?;
        let reply =
            self.session
                .command_redacted(&STANDARD.encode(password), REDACTED, Framing::Smtp)?;
        expect(smtp_code(&reply, 235), "password")
    }
}

impl<C: Connector> ProtocolProbe for SmtpProbe<'_, C> {
    fn role(&self) -> Role {
        Role::Smtp
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
