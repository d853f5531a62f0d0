/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. Only standard
/// RFC 7519 claims are used; the subject is the user id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, InternalError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id, so two tokens minted in the same second differ
    pub jti: String,
}

impl Claims {
    /// Create claims for `subject` valid for `expiry_seconds` from now
    pub fn new(subject: &str, expiry_seconds: i64, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|e| {
            InternalError::new("parse_claims", "Invalid token subject", e.to_string()).into()
        })
    }
}
