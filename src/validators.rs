/// Input validators for login submissions
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Phishing Protection: Email format and pattern checks
/// 3. Aggregated reporting: every violation is returned, not just the first

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_PASSWORD_LENGTH: usize = 128; // bcrypt only looks at 72 bytes anyway

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Credentials that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCredentials {
    pub email: String,
    pub password: String,
}

/// Validates a login submission.
///
/// Missing fields are treated the same as empty ones. All violations
/// found in both fields are collected into a single
/// [`ValidationError::Aggregate`].
pub fn validate_credentials(
    email: Option<&str>,
    password: Option<&str>,
) -> Result<ValidCredentials, ValidationError> {
    let mut violations = Vec::new();

    let email = match is_valid_email(email.unwrap_or_default()) {
        Ok(email) => Some(email),
        Err(e) => {
            violations.push(e);
            None
        }
    };

    let password = match is_valid_password(password.unwrap_or_default()) {
        Ok(password) => Some(password),
        Err(e) => {
            violations.push(e);
            None
        }
    };

    match (email, password) {
        (Some(email), Some(password)) => Ok(ValidCredentials { email, password }),
        _ => Err(ValidationError::Aggregate(violations)),
    }
}

/// Validates email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Detects potential phishing patterns
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a submitted password.
///
/// Strength rules belong to signup; here we only reject empty and
/// oversized input. The password is not trimmed.
pub fn is_valid_password(password: &str) -> Result<String, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    Ok(password.to_string())
}

/// Detects suspicious patterns in email addresses that might indicate phishing
fn has_suspicious_email_patterns(email: &str) -> bool {
    if email.contains('\0') {
        return true;
    }

    if email.matches('@').count() > 1 {
        return true;
    }

    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return true;
        }
    }

    false
}
