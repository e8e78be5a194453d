//! Field rules shared by request payloads.

use std::borrow::Cow;
use validator::{ValidateEmail, ValidationError};

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(rule(
            "username_charset",
            "Username may only contain letters and digits",
        ))
    }
}

/// At least one lowercase and one uppercase letter
pub fn validate_password_strength(value: &str) -> Result<(), ValidationError> {
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Ok(())
    } else {
        Err(rule(
            "password_strength",
            "Password must contain an uppercase and a lowercase letter",
        ))
    }
}

/// Email when it contains `@`, username otherwise
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if value.contains('@') {
        if value.validate_email() {
            Ok(())
        } else {
            Err(rule("email", "Email address is invalid"))
        }
    } else if (3..=30).contains(&value.chars().count()) {
        validate_username(value)
    } else {
        Err(rule(
            "username_length",
            "Username must be between 3 and 30 characters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username() {
        assert!(validate_username("alice42").is_ok());
        assert!(validate_username("alice_42").is_err());
        assert!(validate_username("al ice").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Secret123").is_ok());
        assert!(validate_password_strength("secret123").is_err());
        assert!(validate_password_strength("SECRET123").is_err());
    }

    #[test]
    fn test_identifier() {
        assert!(validate_identifier("alice").is_ok());
        assert!(validate_identifier("alice@example.com").is_ok());
        assert!(validate_identifier("alice@").is_err());
        assert!(validate_identifier("al").is_err());
    }
}
