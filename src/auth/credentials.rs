/// User credential lookup
///
/// The login flow reads users through [`CredentialStore`]. The server
/// uses [`PgCredentialStore`]; [`InMemoryCredentialStore`] backs tests
/// and local runs without a database.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DatabaseError::CorruptRecord(format!("unknown role {}", other))),
        }
    }
}

/// A stored user. The hash never leaves this type except through
/// [`UserRecord::verify_password`].
#[derive(Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    password_hash: String,
}

impl UserRecord {
    pub fn new(id: Uuid, email: String, name: String, role: Role, password_hash: String) -> Self {
        Self {
            id,
            email,
            name,
            role,
            password_hash,
        }
    }

    /// Compare a plaintext password with the stored bcrypt hash
    pub fn verify_password(&self, plaintext: &str) -> Result<bool, AppError> {
        verify_password(plaintext, &self.password_hash)
    }
}

// Keeps the hash out of logs.
impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;
}

/// Postgres-backed store reading the `users` table
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String, String)>(
            "SELECT id, email, name, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, email, name, role, password_hash)| -> Result<UserRecord, AppError> {
            let role = role.parse::<Role>()?;
            Ok(UserRecord::new(id, email, name, role, password_hash))
        })
        .transpose()
    }
}

/// Store keeping users in memory, keyed by email
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.email.clone(), user);
    }

    /// Hash `password` and store a new user, returning its id
    pub async fn add_user(
        &self,
        email: &str,
        name: &str,
        role: Role,
        password: &str,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(password)?;
        self.insert(UserRecord::new(
            id,
            email.to_string(),
            name.to_string(),
            role,
            password_hash,
        ))
        .await;
        Ok(id)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}
