use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use login_service::auth::{
    InMemoryCredentialStore, JwtSigner, LoginHandler, LoginPolicy, Role, SignRequest,
    SigningError, TokenPolicy, TokenSigner,
};
use actix_web::cookie::SameSite;
use login_service::configuration::{CookiePolicy, CookieSettings};
use login_service::error::ErrorResponse;
use login_service::session_cache::{session_key, InMemorySessionCache, SessionCache, TokenKind};
use login_service::startup::run;
use reqwest::header::SET_COOKIE;
use serde_json::{json, Value};
use uuid::Uuid;

const ACCESS_SECRET: &str = "access-secret-key-at-least-32-characters";
const REFRESH_SECRET: &str = "refresh-secret-key-at-least-32-characters";
const ACCESS_TTL: u64 = 900;
const REFRESH_TTL: u64 = 604800;

pub struct TestApp {
    pub address: String,
    pub cache: Arc<InMemorySessionCache>,
    pub user_id: Uuid,
}

impl TestApp {
    async fn post_login(&self, body: &Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}/auth/login", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

struct BrokenSigner;

impl TokenSigner for BrokenSigner {
    fn sign(&self, _request: &SignRequest<'_>) -> Result<String, SigningError> {
        Err(SigningError("signing key unavailable".to_string()))
    }
}

fn policy(uniform_credential_errors: bool) -> LoginPolicy {
    LoginPolicy {
        access: TokenPolicy {
            secret: ACCESS_SECRET.to_string(),
            ttl: Duration::from_secs(ACCESS_TTL),
        },
        refresh: TokenPolicy {
            secret: REFRESH_SECRET.to_string(),
            ttl: Duration::from_secs(REFRESH_TTL),
        },
        uniform_credential_errors,
    }
}

async fn spawn_app_with(
    signer: Arc<dyn TokenSigner>,
    uniform_credential_errors: bool,
    cookie_policy: CookiePolicy,
) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryCredentialStore::new());
    let user_id = store
        .add_user("a@x.com", "Alice", Role::User, "correct")
        .await
        .expect("Failed to seed user");

    let cache = Arc::new(InMemorySessionCache::new());
    let handler = LoginHandler::new(store, signer, cache.clone(), policy(uniform_credential_errors));

    let server = run(listener, handler, cookie_policy).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        cache,
        user_id,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(
        Arc::new(JwtSigner::new("test", 604800)),
        false,
        CookiePolicy::default(),
    )
    .await
}

fn refresh_cookie_value(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.strip_prefix("tc_refresh_token="))
                .map(str::to_string)
        })
}

// --- Success ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app().await;

    let response = app
        .post_login(&json!({"email": "a@x.com", "password": "correct"}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let cookie = refresh_cookie_value(&response).expect("Missing refresh token cookie");

    let body: Value = response.json().await.expect("Failed to parse response");
    let access_token = body["accessToken"].as_str().unwrap();
    let refresh_token = body["refreshToken"].as_str().unwrap();

    assert!(!access_token.is_empty());
    assert!(!refresh_token.is_empty());
    assert_eq!(cookie, refresh_token);

    assert_eq!(body["user"]["_id"], app.user_id.to_string());
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"].as_object().unwrap().len(), 4);

    let claims = JwtSigner::new("test", 604800)
        .verify(access_token, ACCESS_SECRET)
        .expect("Access token not signed with the access secret");
    assert_eq!(claims.user_id().unwrap(), app.user_id);
}

#[tokio::test]
async fn login_persists_both_tokens_with_configured_ttl() {
    let app = spawn_app().await;

    let response = app
        .post_login(&json!({"email": "a@x.com", "password": "correct"}))
        .await;
    let body: Value = response.json().await.expect("Failed to parse response");

    let access_key = session_key(TokenKind::Access, &app.user_id);
    let refresh_key = session_key(TokenKind::Refresh, &app.user_id);

    assert_eq!(app.cache.len().await, 2);
    assert_eq!(
        app.cache.get(&access_key).await.unwrap().as_deref(),
        body["accessToken"].as_str()
    );
    assert_eq!(
        app.cache.get(&refresh_key).await.unwrap().as_deref(),
        body["refreshToken"].as_str()
    );

    let access_ttl = app.cache.ttl(&access_key).await.unwrap().unwrap();
    let refresh_ttl = app.cache.ttl(&refresh_key).await.unwrap().unwrap();
    assert!(access_ttl <= Duration::from_secs(ACCESS_TTL));
    assert!(access_ttl > Duration::from_secs(ACCESS_TTL - 10));
    assert!(refresh_ttl <= Duration::from_secs(REFRESH_TTL));
    assert!(refresh_ttl > Duration::from_secs(REFRESH_TTL - 10));
}

#[tokio::test]
async fn login_cookie_has_explicit_attributes() {
    let app = spawn_app().await;

    let response = app
        .post_login(&json!({"email": "a@x.com", "password": "correct"}))
        .await;

    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("Missing Set-Cookie header")
        .to_str()
        .unwrap()
        .to_string();

    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains(&format!("Max-Age={}", REFRESH_TTL)));
}

#[tokio::test]
async fn login_cookie_follows_configured_policy() {
    let settings = CookieSettings {
        same_site: "strict".to_string(),
        secure: false,
        path: "/auth".to_string(),
        ..CookieSettings::default()
    };
    let policy = settings.policy().expect("Cookie settings should be valid");
    assert_eq!(policy.same_site, SameSite::Strict);

    let app = spawn_app_with(Arc::new(JwtSigner::new("test", 604800)), false, policy).await;

    let response = app
        .post_login(&json!({"email": "a@x.com", "password": "correct"}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("Missing Set-Cookie header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/auth"));
    assert!(!cookie.contains("Secure"));

    let token = refresh_cookie_value(&response).expect("Missing refresh token cookie");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["refreshToken"].as_str(), Some(token.as_str()));
    assert_eq!(app.cache.len().await, 2);
}

#[tokio::test]
async fn login_trims_surrounding_whitespace_from_email() {
    let app = spawn_app().await;

    let response = app
        .post_login(&json!({"email": "  a@x.com ", "password": "correct"}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["email"], "a@x.com");
}

#[test]
fn unknown_same_site_never_reaches_the_server() {
    let settings = CookieSettings {
        same_site: "bogus".to_string(),
        ..CookieSettings::default()
    };
    assert!(settings.policy().is_err());
}

// --- Failures ---

#[tokio::test]
async fn login_returns_400_for_nonexistent_user() {
    let app = spawn_app().await;

    let response = app
        .post_login(&json!({"email": "ghost@x.com", "password": "x"}))
        .await;

    assert_eq!(400, response.status().as_u16());
    assert!(refresh_cookie_value(&response).is_none());

    let body: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert!(body.message.contains("does not exist"));
    assert_eq!(body.code, "EMAIL_NOT_FOUND");
}

#[tokio::test]
async fn login_returns_401_for_unknown_email_when_errors_are_uniform() {
    let app = spawn_app_with(
        Arc::new(JwtSigner::new("test", 604800)),
        true,
        CookiePolicy::default(),
    )
    .await;

    let unknown = app
        .post_login(&json!({"email": "ghost@x.com", "password": "x"}))
        .await;
    let wrong_password = app
        .post_login(&json!({"email": "a@x.com", "password": "incorrect"}))
        .await;

    assert_eq!(401, unknown.status().as_u16());
    assert_eq!(401, wrong_password.status().as_u16());

    let unknown: ErrorResponse = unknown.json().await.unwrap();
    let wrong_password: ErrorResponse = wrong_password.json().await.unwrap();
    assert_eq!(unknown.message, wrong_password.message);
}

#[tokio::test]
async fn login_returns_401_for_invalid_password() {
    let app = spawn_app().await;

    let response = app
        .post_login(&json!({"email": "a@x.com", "password": "incorrect"}))
        .await;

    assert_eq!(401, response.status().as_u16());
    assert!(refresh_cookie_value(&response).is_none());
    assert!(app.cache.is_empty().await);
}

#[tokio::test]
async fn login_returns_400_for_missing_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"email": "a@x.com"}), "missing password", vec!["password is empty"]),
        (json!({"password": "correct"}), "missing email", vec!["email is empty"]),
        (
            json!({}),
            "missing all fields",
            vec!["email is empty", "password is empty"],
        ),
        (
            json!({"email": "not-an-email", "password": ""}),
            "bad email and empty password",
            vec!["email has invalid format", "password is empty"],
        ),
    ];

    for (body, reason, expected) in test_cases {
        let response = app.post_login(&body).await;

        assert_eq!(400, response.status().as_u16(), "Should reject request: {}", reason);

        let error: ErrorResponse = response.json().await.expect("Failed to parse response");
        assert_eq!(error.code, "VALIDATION_ERROR");
        for fragment in expected {
            assert!(
                error.message.contains(fragment),
                "message {:?} should mention {:?} ({})",
                error.message,
                fragment,
                reason
            );
        }
    }
}

#[tokio::test]
async fn login_returns_400_for_malformed_body() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn login_returns_500_and_caches_nothing_when_signing_fails() {
    let app = spawn_app_with(Arc::new(BrokenSigner), false, CookiePolicy::default()).await;

    let response = app
        .post_login(&json!({"email": "a@x.com", "password": "correct"}))
        .await;

    assert_eq!(500, response.status().as_u16());
    assert!(refresh_cookie_value(&response).is_none());

    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(
        error.message,
        "Something went wrong while trying to generate an access token"
    );
    assert!(!error.message.contains("signing key unavailable"));
    assert!(app.cache.is_empty().await);
}
