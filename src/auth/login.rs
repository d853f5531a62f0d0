/// Login orchestration
///
/// Validates a credential submission, checks it against the credential
/// store, signs an access/refresh token pair and records both in the
/// session cache. HTTP concerns (cookie, status codes) live in
/// `routes::auth`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::credentials::{CredentialStore, Role, UserRecord};
use crate::auth::jwt::{SignRequest, TokenSigner};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext, InternalError, NotFoundError};
use crate::session_cache::{session_key, SessionCache, TokenKind};
use crate::validators::validate_credentials;

/// Per-kind signing parameters
#[derive(Clone)]
pub struct TokenPolicy {
    pub secret: String,
    pub ttl: Duration,
}

/// Everything the handler needs to know about tokens
#[derive(Clone)]
pub struct LoginPolicy {
    pub access: TokenPolicy,
    pub refresh: TokenPolicy,
    /// Report unknown emails as invalid credentials (401) instead of 400
    pub uniform_credential_errors: bool,
}

impl LoginPolicy {
    pub fn from_settings(jwt: &JwtSettings, uniform_credential_errors: bool) -> Self {
        Self {
            access: TokenPolicy {
                secret: jwt.access_token_secret.clone(),
                ttl: jwt.access_token_ttl(),
            },
            refresh: TokenPolicy {
                secret: jwt.refresh_token_secret.clone(),
                ttl: jwt.refresh_token_ttl(),
            },
            uniform_credential_errors,
        }
    }
}

/// User fields safe to return to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProjection {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&UserRecord> for UserProjection {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Successful login payload
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProjection,
}

/// Signed tokens for one login; both exist or the login failed
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

pub struct LoginHandler {
    credentials: Arc<dyn CredentialStore>,
    signer: Arc<dyn TokenSigner>,
    cache: Arc<dyn SessionCache>,
    policy: LoginPolicy,
}

impl LoginHandler {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        signer: Arc<dyn TokenSigner>,
        cache: Arc<dyn SessionCache>,
        policy: LoginPolicy,
    ) -> Self {
        Self {
            credentials,
            signer,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> &LoginPolicy {
        &self.policy
    }

    /// Run one login attempt.
    ///
    /// # Errors
    /// - `Validation`: missing or malformed email/password (400)
    /// - `NotFound`: no user with that email (400), or `Auth` when
    ///   uniform credential errors are enabled
    /// - `Auth`: password mismatch (401)
    /// - `Internal`: either token failed to sign (500); nothing is cached
    /// - `Cache`: a session write failed (500); partial writes are undone
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<LoginResponse, AppError> {
        let context = ErrorContext::new("user_login");

        let credentials = validate_credentials(email, password)?;

        let user = match self.credentials.find_by_email(&credentials.email).await? {
            Some(user) => user,
            None if self.policy.uniform_credential_errors => {
                return Err(AuthError::InvalidCredentials.into())
            }
            None => return Err(NotFoundError::Email.into()),
        };

        if !user.verify_password(&credentials.password)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let context = context.with_user_id(user.id.to_string());
        let tokens = self.issue_tokens(&user.id)?;

        // failures are logged once, by the ResponseError impl
        self.persist_session(&user.id, &tokens).await?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = ?context.user_id,
            "User logged in successfully"
        );

        Ok(LoginResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: UserProjection::from(&user),
        })
    }

    fn issue_tokens(&self, user_id: &Uuid) -> Result<TokenPair, AppError> {
        let subject = user_id.to_string();

        let access_token = self
            .signer
            .sign(&SignRequest {
                subject: &subject,
                secret: &self.policy.access.secret,
                expires_in: Some(self.policy.access.ttl.as_secs() as i64),
            })
            .map_err(|e| {
                InternalError::new(
                    "sign_token",
                    "Something went wrong while trying to generate an access token",
                    e.to_string(),
                )
            })?;

        // refresh tokens take the signer's default lifetime
        let refresh_token = self
            .signer
            .sign(&SignRequest {
                subject: &subject,
                secret: &self.policy.refresh.secret,
                expires_in: None,
            })
            .map_err(|e| {
                InternalError::new(
                    "sign_token",
                    "Something went wrong while trying to generate a refresh token",
                    e.to_string(),
                )
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Writes `refresh:<id>` then `access:<id>`. If the second write
    /// fails the first is deleted again.
    async fn persist_session(&self, user_id: &Uuid, tokens: &TokenPair) -> Result<(), AppError> {
        let refresh_key = session_key(TokenKind::Refresh, user_id);
        let access_key = session_key(TokenKind::Access, user_id);

        self.cache
            .set_with_expiry(&refresh_key, self.policy.refresh.ttl, &tokens.refresh_token)
            .await?;

        if let Err(e) = self
            .cache
            .set_with_expiry(&access_key, self.policy.access.ttl, &tokens.access_token)
            .await
        {
            if let Err(cleanup) = self.cache.delete(&refresh_key).await {
                tracing::error!(
                    user_id = %user_id,
                    error = %cleanup,
                    "Failed to remove refresh token after partial session write"
                );
            }
            return Err(e.into());
        }

        Ok(())
    }
}
