/// Authentication Routes
///
/// HTTP surface of the login flow: body extraction, the refresh token
/// cookie and the JSON response.

use std::time::Duration;

use actix_web::cookie::{time, Cookie};
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::LoginHandler;
use crate::configuration::CookiePolicy;
use crate::error::{AppError, ValidationError};

/// User login request
///
/// Both fields are optional so that missing ones are reported by
/// validation together with any other violation.
#[derive(Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /auth/login
///
/// Authenticate user with email and password.
/// Returns both tokens and the user's public fields, and sets the
/// refresh token cookie.
///
/// # Errors
/// - 400: Validation error, or email does not exist
/// - 401: Password does not match
/// - 500: Token signing or session persistence failed
/// - 503: Credential store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    handler: web::Data<LoginHandler>,
    cookie_policy: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let response = handler
        .login(form.email.as_deref(), form.password.as_deref())
        .await?;

    let cookie = refresh_token_cookie(
        &cookie_policy,
        response.refresh_token.clone(),
        handler.policy().refresh.ttl,
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

/// Cookie carrying the refresh token, with every attribute explicit
pub fn refresh_token_cookie(
    policy: &CookiePolicy,
    token: String,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build(policy.refresh_token_name.clone(), token)
        .path(policy.path.clone())
        .http_only(policy.http_only)
        .secure(policy.secure)
        .same_site(policy.same_site)
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .finish()
}

/// Turns unreadable JSON bodies into 400 validation errors
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(error = %err, "Rejected request body");
    AppError::Validation(ValidationError::InvalidFormat("request body".to_string())).into()
}
