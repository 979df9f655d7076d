use garde::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AppError, Result};

/// The minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;
/// The maximum password length, in characters.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Registration input as checked before anything is hashed or persisted.
#[derive(Validate, Zeroize, ZeroizeOnDrop)]
pub struct Registration {
    #[garde(length(chars, min = 1, max = 255))]
    pub name: String,
    #[garde(email, length(max = 255))]
    pub email: String,
    #[garde(length(chars, min = 8, max = 128))]
    pub password: String,
}

/// Why a password was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordProblem {
    TooShort,
    TooLong,
}

/// Normalises an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a registration. `name` and `email` are expected to be trimmed.
pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<()> {
    Registration {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
    .validate()?;
    Ok(())
}

/// Validates a display name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    if name.chars().count() > 255 {
        return Err(AppError::Validation(
            "Name must be at most 255 characters".to_string(),
        ));
    }

    Ok(())
}

/// Checks a new password against the length rules.
pub fn check_password(password: &str) -> std::result::Result<(), PasswordProblem> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(PasswordProblem::TooShort);
    }
    if len > MAX_PASSWORD_LEN {
        return Err(PasswordProblem::TooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_registration() {
        assert!(validate_registration("Alice", "a@x.com", "secret1234").is_ok());
    }

    #[test]
    fn rejects_bad_email() {
        let err = validate_registration("Alice", "not-an-email", "secret1234").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate_registration("Alice", "a@x.com", "short").is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(validate_registration("", "a@x.com", "secret1234").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn password_bounds() {
        assert_eq!(check_password("1234567"), Err(PasswordProblem::TooShort));
        assert_eq!(check_password("12345678"), Ok(()));
        assert_eq!(check_password(&"x".repeat(129)), Err(PasswordProblem::TooLong));
    }

    #[test]
    fn password_length_counts_characters() {
        assert_eq!(check_password("ééééééé"), Err(PasswordProblem::TooShort));
        assert_eq!(check_password("éééééééé"), Ok(()));
    }

    #[test]
    fn email_normalisation() {
        assert_eq!(normalize_email("  Alice@X.com "), "alice@x.com");
    }
}
