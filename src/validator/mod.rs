mod domain;
mod types;

pub use types::{EmailAddress, EmailError};

use domain::check_domain;

/// Découpe `email` en partie locale et domaine.
///
/// Syntaxe seulement : exactement un `@`, parties non vides, ni espace ni
/// caractère de contrôle, domaine convertible en IDNA.
pub fn parse_address(email: &str) -> Result<EmailAddress, EmailError> {
    let input = email.trim();
    let mut reasons = Vec::new();

    let parts: Vec<&str> = input.split('@').collect();
    if parts.len() != 2 {
        reasons.push("must contain exactly one '@'".to_string());
        return Err(EmailError::InvalidFormat { reasons });
    }
    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        reasons.push("local part is empty".to_string());
    }
    if local.chars().any(|c| c.is_whitespace() || c.is_control()) {
        reasons.push("local part contains whitespace or control characters".to_string());
    }
    if domain.is_empty() {
        reasons.push("domain is empty".to_string());
        return Err(EmailError::InvalidFormat { reasons });
    }
    if domain.chars().any(|c| c.is_whitespace() || c.is_control()) {
        reasons.push("domain contains whitespace or control characters".to_string());
        return Err(EmailError::InvalidFormat { reasons });
    }

    let ascii_domain = check_domain(domain, &mut reasons);
    match ascii_domain {
        Some(ascii_domain) if reasons.is_empty() => Ok(EmailAddress {
            original: input.to_string(),
            local: local.to_string(),
            domain: domain.to_lowercase(),
            ascii_domain,
        }),
        _ => Err(EmailError::InvalidFormat { reasons }),
    }
}
