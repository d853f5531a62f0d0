use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use login_service::auth::{CredentialStore, JwtSigner, LoginHandler, LoginPolicy, PgCredentialStore};
use login_service::configuration::{get_configuration, CacheBackend};
use login_service::session_cache::{spawn_janitor, InMemorySessionCache, PgSessionCache, SessionCache};
use login_service::startup::run;
use login_service::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if let Err(e) = configuration.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Configuration error",
        ));
    }
    let cookie_policy = configuration.cookie.policy().map_err(|e| {
        tracing::error!("Invalid cookie configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;
    tracing::info!("Database connection pool created successfully");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to migrate the database: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
        })?;

    let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool.clone()));

    let cache: Arc<dyn SessionCache> = match configuration.session_cache.backend {
        CacheBackend::Postgres => Arc::new(PgSessionCache::new(pool.clone())),
        CacheBackend::Memory => {
            tracing::warn!("Using in-process session cache; sessions are lost on restart");
            Arc::new(InMemorySessionCache::new())
        }
    };
    let janitor = spawn_janitor(
        cache.clone(),
        Duration::from_secs(configuration.session_cache.cleanup_interval),
    );

    let jwt = &configuration.jwt;
    let signer = Arc::new(JwtSigner::new(jwt.issuer.clone(), jwt.default_token_expiry));
    let policy = LoginPolicy::from_settings(jwt, configuration.application.uniform_credential_errors);
    let login_handler = LoginHandler::new(credentials, signer, cache, policy);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, login_handler, cookie_policy)?;
    let result = server.await;

    tracing::info!("Shutting down");
    janitor.abort();
    pool.close().await;

    result
}
