//! Email format checking
//!
//! A pure predicate run before anything else in the pipeline. The grammar is
//! deliberately conservative: an unquoted local part, `@`, then one or more
//! DNS labels of 1-63 alphanumeric characters with internal hyphens only.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email grammar is a valid regex")
});

/// Check whether `email` matches the accepted email grammar.
///
/// Empty input is simply not valid.
pub fn is_valid_format(email: &str) -> bool {
    !email.is_empty() && EMAIL_RE.is_match(email)
}

/// Remove every whitespace character, wherever it appears.
pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Split an email into `(local, domain)`; `None` unless there is exactly one `@`.
pub fn split_email(email: &str) -> Option<(&str, &str)> {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => Some((local, domain)),
        _ => None,
    }
}

/// Lower-cased domain of `email`, if it has exactly one `@`.
pub fn extract_domain(email: &str) -> Option<String> {
    split_email(email).map(|(_, domain)| domain.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_formats() {
        assert!(is_valid_format("john@gmail.com"));
        assert!(is_valid_format("john.smith+tag@sub.example.com.au"));
        assert!(is_valid_format("o'brien@example-corp.com"));
        assert!(is_valid_format("JOHN@EXAMPLE.COM"));
        assert!(is_valid_format("user@localhost"));
    }

    #[test]
    fn test_invalid_formats() {
        assert!(!is_valid_format(""));
        assert!(!is_valid_format("bad-email"));
        assert!(!is_valid_format("a@b@c.com"));
        assert!(!is_valid_format("@example.com"));
        assert!(!is_valid_format("john@"));
        assert!(!is_valid_format("john@-example.com"));
        assert!(!is_valid_format("john@example-.com"));
        assert!(!is_valid_format("john@example..com"));
        assert!(!is_valid_format("john@exa_mple.com"));
        assert!(!is_valid_format("jo hn@example.com"));
    }

    #[test]
    fn test_label_length_limit() {
        let ok = format!("a@{}.com", "x".repeat(63));
        let too_long = format!("a@{}.com", "x".repeat(64));
        assert!(is_valid_format(&ok));
        assert!(!is_valid_format(&too_long));
    }

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" jo hn@gmail.com\t\n"), "john@gmail.com");
        assert_eq!(strip_whitespace("john@gmail.com"), "john@gmail.com");
    }

    #[test]
    fn test_split_and_extract() {
        assert_eq!(split_email("a@b.com"), Some(("a", "b.com")));
        assert_eq!(split_email("ab.com"), None);
        assert_eq!(split_email("a@b@c.com"), None);
        assert_eq!(extract_domain("A@Example.COM"), Some("example.com".to_string()));
        assert_eq!(extract_domain("nope"), None);
    }
}
