use crate::account::Role;

use super::error::VerifyError;
use super::session::Session;
use super::stream::Connector;

/// A connectivity check for one protocol.
///
/// [`check`](ProtocolProbe::check) leaves the session open on success so
/// that [`authenticate`](ProtocolProbe::authenticate) can reuse it; the
/// latter always closes it.
pub trait ProtocolProbe {
    fn role(&self) -> Role;

    fn check(&mut self) -> bool;

    fn authenticate(&mut self, username: &str, password: &str) -> bool;

    fn close(&mut self);

    /// Commandes et réponses échangées, mots de passe masqués.
    fn transcript(&self) -> &[String];
}

pub(crate) const REDACTED: &str = "****";

pub(crate) fn expect(accepted: bool, step: &str) -> Result<(), VerifyError> {
    if accepted {
        Ok(())
    } else {
        Err(VerifyError::protocol(format!("{step} rejected")))
    }
}

/// Verdict du check ; la session est fermée en cas d'échec.
pub(crate) fn conclude_check<C: Connector>(
    session: &mut Session<'_, C>,
    outcome: Result<(), VerifyError>,
) -> bool {
    match outcome {
        Ok(()) => true,
        Err(err) => {
            session.note_failure(&err);
            session.close();
            false
        }
    }
}

/// Verdict du login ; la session est fermée dans tous les cas.
pub(crate) fn conclude_login<C: Connector>(
    session: &mut Session<'_, C>,
    outcome: Result<(), VerifyError>,
) -> bool {
    let valid = match outcome {
        Ok(()) => true,
        Err(err) => {
            session.note_failure(&err);
            false
        }
    };
    session.close();
    valid
}
