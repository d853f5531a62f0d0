/// Error Handling Module
///
/// A single error type for the whole service. It covers:
/// 1. Domain-specific error types (validation, lookup, authentication, storage)
/// 2. HTTP response mapping with a structured error body
/// 3. Structured error logging with request context
///
/// Client-facing messages and operator-facing detail are kept apart:
/// only the former is ever serialized into a response.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
    /// Several violations reported together
    Aggregate(Vec<ValidationError>),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
            ValidationError::Aggregate(errors) => {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", messages.join(", "))
            }
        }
    }
}

impl StdError for ValidationError {}

/// Lookup failures that are reported to the client
#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundError {
    Email,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundError::Email => write!(f, "Email does not exist. Please signup"),
        }
    }
}

impl StdError for NotFoundError {}

/// Authentication errors
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Email or password does not match"),
        }
    }
}

impl StdError for AuthError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    QueryExecution(String),
    ConnectionPool(String),
    CorruptRecord(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::CorruptRecord(msg) => write!(f, "Corrupt record: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Session cache errors
#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    WriteFailed { key: String, reason: String },
    DeleteFailed { key: String, reason: String },
    ReadFailed { key: String, reason: String },
    InvalidTtl(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::WriteFailed { key, reason } => {
                write!(f, "Failed to write cache key {}: {}", key, reason)
            }
            CacheError::DeleteFailed { key, reason } => {
                write!(f, "Failed to delete cache key {}: {}", key, reason)
            }
            CacheError::ReadFailed { key, reason } => {
                write!(f, "Failed to read cache key {}: {}", key, reason)
            }
            CacheError::InvalidTtl(key) => write!(f, "Invalid TTL for cache key {}", key),
        }
    }
}

impl StdError for CacheError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Server-side failure with a message safe to show the client
/// and detail meant only for operators.
#[derive(Debug, Clone)]
pub struct InternalError {
    /// Name of the operation that failed (e.g. `sign_token`)
    pub operation: &'static str,
    /// Message returned to the client
    pub public_message: String,
    /// Underlying cause, logged but never returned
    pub detail: String,
}

impl InternalError {
    pub fn new(
        operation: &'static str,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            public_message: public_message.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.detail)
    }
}

impl StdError for InternalError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    NotFound(NotFoundError),
    Auth(AuthError),
    Database(DatabaseError),
    Cache(CacheError),
    Config(ConfigError),
    Internal(InternalError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::NotFound(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Cache(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<NotFoundError> for AppError {
    fn from(err: NotFoundError) -> Self {
        AppError::NotFound(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Cache(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<InternalError> for AppError {
    fn from(err: InternalError) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            other => AppError::Database(DatabaseError::QueryExecution(other.to_string())),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (code, message) = match self {
            AppError::Validation(e) => ("VALIDATION_ERROR", e.to_string()),
            AppError::NotFound(e) => ("EMAIL_NOT_FOUND", e.to_string()),
            AppError::Auth(e) => ("INVALID_CREDENTIALS", e.to_string()),
            AppError::Database(DatabaseError::ConnectionPool(_)) => (
                "SERVICE_UNAVAILABLE",
                "Database service temporarily unavailable".to_string(),
            ),
            AppError::Database(_) => ("DATABASE_ERROR", "Database error occurred".to_string()),
            AppError::Cache(_) => (
                "SESSION_CACHE_ERROR",
                "Something went wrong while trying to persist the session".to_string(),
            ),
            AppError::Config(_) => ("CONFIG_ERROR", "Server configuration error".to_string()),
            AppError::Internal(e) => ("INTERNAL_ERROR", e.public_message.clone()),
        };

        let status = self.status_code();
        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::NotFound(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Unknown account");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Invalid credentials attempt");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Cache(e) => {
                tracing::error!(request_id = request_id, error = %e, "Session cache error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(e) => {
                tracing::error!(
                    request_id = request_id,
                    operation = e.operation,
                    error = %e.detail,
                    "Internal error"
                );
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::NotFound(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(DatabaseError::ConnectionPool(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context for logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
