//! Field validation for account payloads
//! Collects every violation instead of stopping at the first one.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::password::validate_password;
use crate::error::FieldError;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 100;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("email pattern is valid")
});

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn email(&mut self, email: &str) {
        if email.is_empty() {
            self.push("email", "Email is required");
        } else if email.len() > MAX_EMAIL_LENGTH {
            self.push("email", "Email is too long");
        } else if !EMAIL_RE.is_match(email) {
            self.push("email", "Invalid email address");
        }
    }

    pub fn password(&mut self, password: &str) {
        if let Err(e) = validate_password(password) {
            let message = match e {
                super::AuthError::WeakPassword(msg) => msg,
                other => other.to_string(),
            };
            self.push("password", message);
        }
    }

    pub fn name(&mut self, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            self.push("name", "Name is required");
        } else if trimmed.chars().count() > MAX_NAME_LENGTH {
            self.push("name", format!("Name must be at most {} characters", MAX_NAME_LENGTH));
        }
    }

    /// Returns the parsed date when it is acceptable.
    pub fn birth_date(&mut self, raw: &str) -> Option<NaiveDate> {
        let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") else {
            self.push("birth_date", "Birth date must be formatted as YYYY-MM-DD");
            return None;
        };

        let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
        if date < earliest {
            self.push("birth_date", "Birth date must not be before 1900-01-01");
            None
        } else if date > Utc::now().date_naive() {
            self.push("birth_date", "Birth date must not be in the future");
            None
        } else {
            Some(date)
        }
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Trimmed, lowercased email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_rules() {
        for ok in ["a@b.co", "first.last+tag@mail.example.org"] {
            let mut v = Validator::new();
            v.email(ok);
            assert!(v.finish().is_ok(), "{}", ok);
        }
        for bad in ["", "plain", "a@b", "a@@b.co", "a b@c.de", "@b.co"] {
            let mut v = Validator::new();
            v.email(bad);
            assert!(v.finish().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_collects_all_errors() {
        let mut v = Validator::new();
        v.email("nope");
        v.password("123");
        v.name("   ");
        let errors = v.finish().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password", "name"]);
    }

    #[test]
    fn test_birth_date_rules() {
        let mut v = Validator::new();
        assert_eq!(
            v.birth_date("1990-07-30"),
            NaiveDate::from_ymd_opt(1990, 7, 30)
        );
        assert!(v.birth_date("30/07/1990").is_none());
        assert!(v.birth_date("1899-12-31").is_none());
        assert!(v.birth_date("2999-01-01").is_none());
        assert_eq!(v.finish().unwrap_err().len(), 3);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Star@Example.COM "), "star@example.com");
    }
}
