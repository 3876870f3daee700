//! Connectivity and credential checks against discovered endpoints.
//!
//! The coordinator runs the incoming probe (IMAP or POP3, by role) and then
//! the SMTP probe, storing `server_reachable` / `login_valid` on the
//! configuration. Failures never escape: they become `false` verdicts and
//! transcript lines.

mod error;
mod imap;
mod options;
mod pop3;
mod probe;
mod session;
mod smtp;
mod stream;

pub use error::VerifyError;
pub use imap::ImapProbe;
pub use options::VerifyOptions;
pub use pop3::Pop3Probe;
pub use probe::ProtocolProbe;
pub use smtp::SmtpProbe;
pub use stream::{Connector, MailStream, NativeConnector};

#[cfg(feature = "with-serde")]
use serde::Serialize;

use crate::account::{MailAccountConfig, Role, ServerConfig};

/// Verdict and transcript for one endpoint.
#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReport {
    pub role: Role,
    pub host: String,
    pub port: u16,
    pub reachable: bool,
    /// `None` when no password was supplied or the server was unreachable.
    pub login: Option<bool>,
    pub transcript: Vec<String>,
}

impl EndpointReport {
    pub fn passed(&self) -> bool {
        self.reachable && self.login != Some(false)
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationReport {
    pub incoming: Option<EndpointReport>,
    pub outgoing: Option<EndpointReport>,
}

impl VerificationReport {
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointReport> {
        self.incoming.iter().chain(self.outgoing.iter())
    }

    /// `true` when every checked endpoint is reachable and no login failed.
    pub fn all_passed(&self) -> bool {
        self.endpoints().all(EndpointReport::passed)
    }
}

/// Verifies `config` over real sockets.
pub fn verify_account(
    config: &mut MailAccountConfig,
    password: Option<&str>,
    options: &VerifyOptions,
) -> VerificationReport {
    match NativeConnector::new(options) {
        Ok(connector) => verify_account_with(config, password, &connector, options),
        Err(err) => {
            tracing::warn!(error = %err, "TLS connector unavailable, marking endpoints unreachable");
            let message = err.to_string();
            VerificationReport {
                incoming: config
                    .incoming_mut()
                    .map(|server| unreachable(server, &message)),
                outgoing: config
                    .outgoing_mut()
                    .map(|server| unreachable(server, &message)),
            }
        }
    }
}

/// Verifies `config` through `connector`: incoming first, then outgoing.
/// Login is attempted only with a password and a reachable server.
pub fn verify_account_with<C: Connector>(
    config: &mut MailAccountConfig,
    password: Option<&str>,
    connector: &C,
    options: &VerifyOptions,
) -> VerificationReport {
    let incoming = config.incoming_mut().map(|server| match server.role() {
        Role::Pop3 => {
            let probe = Pop3Probe::new(connector, server, options);
            run_probe(probe, server, password)
        }
        _ => {
            let probe = ImapProbe::new(connector, server, options);
            run_probe(probe, server, password)
        }
    });
    let outgoing = config.outgoing_mut().map(|server| {
        let probe = SmtpProbe::new(connector, server, options);
        run_probe(probe, server, password)
    });
    VerificationReport { incoming, outgoing }
}

fn run_probe<P: ProtocolProbe>(
    mut probe: P,
    server: &mut ServerConfig,
    password: Option<&str>,
) -> EndpointReport {
    tracing::debug!(role = %probe.role(), host = server.host(), port = server.port(), "checking server");
    let reachable = probe.check();
    store(server.record_reachable(reachable), server, "reachability");

    let login = match password {
        Some(password) if reachable => {
            tracing::debug!(role = %probe.role(), host = server.host(), "checking login");
            let valid = probe.authenticate(server.username(), password);
            store(server.record_login(valid), server, "login");
            Some(valid)
        }
        _ => None,
    };
    probe.close();

    EndpointReport {
        role: server.role(),
        host: server.host().to_string(),
        port: server.port(),
        reachable,
        login,
        transcript: probe.transcript().to_vec(),
    }
}

fn store(stored: bool, server: &ServerConfig, verdict: &str) {
    if !stored {
        tracing::debug!(host = server.host(), verdict, "verdict already recorded, keeping first");
    }
}

fn unreachable(server: &mut ServerConfig, message: &str) -> EndpointReport {
    server.record_reachable(false);
    EndpointReport {
        role: server.role(),
        host: server.host().to_string(),
        port: server.port(),
        reachable: false,
        login: None,
        transcript: vec![format!("[{}] !: {message}", server.host())],
    }
}

#[cfg(test)]
mod tests;
