/// JWT Token Signing and Verification
///
/// The login flow only needs "give me a signed token for this subject",
/// so signing sits behind the [`TokenSigner`] trait. [`JwtSigner`] is the
/// HS256 implementation used by the server.

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;

/// Input to a signing call
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    /// Subject the token is issued for (user id)
    pub subject: &'a str,
    /// HMAC secret for this kind of token
    pub secret: &'a str,
    /// Lifetime in seconds; `None` falls back to the signer's default
    pub expires_in: Option<i64>,
}

/// Signing failure. The message is operator detail only.
#[derive(Debug, Clone, PartialEq)]
pub struct SigningError(pub String);

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token signing failed: {}", self.0)
    }
}

impl std::error::Error for SigningError {}

pub trait TokenSigner: Send + Sync {
    fn sign(&self, request: &SignRequest<'_>) -> Result<String, SigningError>;
}

/// HS256 JWT signer
#[derive(Debug, Clone)]
pub struct JwtSigner {
    issuer: String,
    default_expiry: i64,
}

impl JwtSigner {
    /// # Arguments
    /// * `issuer` - value of the `iss` claim
    /// * `default_expiry` - lifetime in seconds when a request names none
    pub fn new(issuer: impl Into<String>, default_expiry: i64) -> Self {
        Self {
            issuer: issuer.into(),
            default_expiry,
        }
    }

    /// Validate a token signed with `secret` and return its claims
    ///
    /// # Errors
    /// Returns error if token is invalid, expired, from another issuer
    /// or signed with a different secret
    pub fn verify(&self, token: &str, secret: &str) -> Result<Claims, SigningError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT validation error: {}", e);
            SigningError(e.to_string())
        })
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, request: &SignRequest<'_>) -> Result<String, SigningError> {
        if request.secret.is_empty() {
            return Err(SigningError("empty signing secret".to_string()));
        }

        let expiry = request.expires_in.unwrap_or(self.default_expiry);
        if expiry <= 0 {
            return Err(SigningError(format!("non-positive lifetime {}", expiry)));
        }

        let claims = Claims::new(request.subject, expiry, &self.issuer);

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(request.secret.as_bytes()),
        )
        .map_err(|e| SigningError(e.to_string()))
    }
}
