use thiserror::Error;

/// Adresse syntaxiquement valide, découpée en parties.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    /// Entrée nettoyée des espaces, telle que fournie.
    pub original: String,
    pub local: String,
    /// Domaine en minuscules, forme Unicode conservée.
    pub domain: String,
    /// Forme IDNA (punycode) du domaine, utilisée pour le DNS et les URL.
    pub ascii_domain: String,
}

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid email address: {}", reasons.join("; "))]
    InvalidFormat { reasons: Vec<String> },
}
