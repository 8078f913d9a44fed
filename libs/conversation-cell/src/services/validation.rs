use std::sync::LazyLock;

use regex::Regex;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+$").expect("EMAIL_REGEX is a compile-time constant")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[\d\s\-\.\(\)]+$").expect("PHONE_REGEX is a compile-time constant")
});

static DIGIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d").expect("DIGIT_REGEX is a compile-time constant"));

/// Something before and after a single `@`, with no whitespace.
pub fn validate_email(email: &str) -> Option<String> {
    let email = email.trim();
    (EMAIL_REGEX.is_match(email) && email.len() <= 254).then(|| email.to_string())
}

/// At least seven digits; separators and a leading `+` are allowed.
pub fn validate_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    let digits = DIGIT_REGEX.find_iter(phone).count();
    (PHONE_REGEX.is_match(phone) && digits >= 7).then(|| phone.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_rules() {
        assert_eq!(validate_email(" anita@example.com "), Some("anita@example.com".to_string()));
        assert!(validate_email("anita@").is_none());
        assert!(validate_email("@example.com").is_none());
        assert!(validate_email("anita example.com").is_none());
        assert!(validate_email("a@b@c").is_none());
    }

    #[test]
    fn test_phone_rules() {
        assert_eq!(validate_phone("+91 98765-43210"), Some("+91 98765-43210".to_string()));
        assert!(validate_phone("12345").is_none());
        assert!(validate_phone("call me maybe").is_none());
        assert!(validate_phone("98765 43210 ext").is_none());
        assert!(validate_phone("91+98765").is_none());
    }
}
