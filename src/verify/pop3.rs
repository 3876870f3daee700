use crate::account::{Role, ServerConfig};

use super::error::VerifyError;
use super::options::VerifyOptions;
use super::probe::{ProtocolProbe, REDACTED, conclude_check, conclude_login, expect};
use super::session::{Framing, Session, pop3_ok};
use super::stream::Connector;

/// Sonde POP3 : salutation, `STLS` éventuel, puis `USER` / `PASS`.
pub struct Pop3Probe<'a, C: Connector> {
    session: Session<'a, C>,
}

impl<'a, C: Connector> Pop3Probe<'a, C> {
    pub fn new(connector: &'a C, server: &ServerConfig, options: &'a VerifyOptions) -> Self {
        Self {
            session: Session::new(connector, server, options),
        }
    }

    fn try_check(&mut self) -> Result<(), VerifyError> {
        let greeting = self.session.open(Framing::SingleLine)?;
        expect(pop3_ok(&greeting), "greeting")?;
        if self.session.wants_starttls() {
            let reply = self.session.command("STLS", Framing::SingleLine)?;
            expect(pop3_ok(&reply), "STLS")?;
            self.session.upgrade()?;
        }
        Ok(())
    }

    fn try_login(&mut self, username: &str, password: &str) -> Result<(), VerifyError> {
        let reply = self
            .session
            .command(&format!("USER {username}"), Framing::SingleLine)?;
        expect(pop3_ok(&reply), "USER")?;
        let reply = self.session.command_redacted(
            &format!("PASS {password}"),
            &format!("PASS {REDACTED}"),
            Framing::SingleLine,
        )?;
        expect(pop3_ok(&reply), "PASS")
    }
}

impl<C: Connector> ProtocolProbe for Pop3Probe<'_, C> {
    fn role(&self) -> Role {
        Role::Pop3
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
