use chrono::{DateTime, Utc};
use validator::ValidateEmail;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Basic address-format check (local part, `@`, domain).
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("first.last+tag@shop.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }
}
