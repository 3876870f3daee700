use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Réglages de [`verify_account`](super::verify_account).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Nom annoncé dans `EHLO`.
    pub helo_domain: String,
    pub connect_timeout_ms: u64,
    /// Inactivité au-delà de laquelle une lecture rend ce qu'elle a reçu.
    pub read_timeout_ms: u64,
    /// Plafond de durée d'une session ; zéro garde le plafond par défaut.
    pub session_timeout_ms: u64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            helo_domain: "localhost".to_string(),
            connect_timeout_ms: 30_000,
            read_timeout_ms: 2_000,
            session_timeout_ms: DEFAULT_SESSION_MS,
        }
    }
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_helo_domain(mut self, helo: impl Into<String>) -> Self {
        self.helo_domain = helo.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout_ms = duration_ms(timeout);
        self
    }

    /// Zéro : seule l'échéance de session borne la connexion.
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero(self.connect_timeout_ms)
    }

    /// Zéro : pas de délai d'inactivité, les lectures restent bornées par
    /// l'échéance de session.
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero(self.read_timeout_ms)
    }

    /// Toujours défini : une session ne peut pas durer indéfiniment.
    pub fn session_timeout(&self) -> Duration {
        non_zero(self.session_timeout_ms)
            .unwrap_or(Duration::from_millis(DEFAULT_SESSION_MS))
    }

    pub fn helo_name(&self) -> &str {
        let helo = self.helo_domain.trim();
        if helo.is_empty() { "localhost" } else { helo }
    }
}

const DEFAULT_SESSION_MS: u64 = 300_000;

fn non_zero(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

fn duration_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
