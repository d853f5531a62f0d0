/// Password Hashing and Verification
///
/// bcrypt with the library's default cost.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, InternalError};

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| {
        InternalError::new("hash_password", "Internal server error", e.to_string()).into()
    })
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash).map_err(|e| {
        InternalError::new("verify_password", "Internal server error", e.to_string()).into()
    })
}
