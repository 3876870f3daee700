/// Convertit le domaine en ASCII (IDNA) puis contrôle chaque label ; les
/// raisons d'invalidité s'ajoutent à `reasons`.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    let domain_ascii = match idna::domain_to_ascii(domain) {
        Ok(d) => d,
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    if domain_ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return None;
    }

    let before = reasons.len();
    for label in domain_ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!(
                "domain label '{}' cannot start/end with '-'",
                label
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{}' has invalid chars", label));
        }
    }

    if reasons.len() == before {
        Some(domain_ascii)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn basic_domain_ok() {
        let mut reasons = vec![];
        let ascii = check_domain("example.com", &mut reasons);
        assert!(reasons.is_empty(), "{:?}", reasons);
        assert_eq!(ascii.as_deref(), Some("example.com"));
    }

    #[test]
    fn label_too_long() {
        let long = "a".repeat(64);
        let mut reasons = vec![];
        assert!(check_domain(&format!("{}.com", long), &mut reasons).is_none());
        assert!(!reasons.is_empty());
    }

    #[test]
    fn unicode_domain_is_punycoded() {
        let mut reasons = vec![];
        let ascii = check_domain("exämple.com", &mut reasons).expect("idna succeeds");
        assert!(ascii.starts_with("xn--"), "{ascii}");
    }

    #[test]
    fn trailing_dot_yields_empty_label() {
        let mut reasons = vec![];
        assert!(check_domain("example.com.", &mut reasons).is_none());
        assert!(reasons.iter().any(|r| r.contains("empty domain label")));
    }
}
