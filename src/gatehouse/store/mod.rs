//! User and session storage contracts.
//!
//! The auth handlers only talk to storage through [`CredentialStore`] and
//! [`SessionStore`]. `postgres` backs a real deployment; `memory` keeps
//! everything in process and is used by tests and the `--memory-store` mode.

pub mod memory;
pub mod postgres;
mod token;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, pin::Pin};
use thiserror::Error;
use uuid::Uuid;

use super::password;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub(crate) use token::{generate_session_token, hash_session_token};

/// Longest session lifetime the stores accept (ten years).
pub const MAX_SESSION_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Boxed future returned by the storage traits.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Password(String),
    #[error("session token generation failed: {0}")]
    Token(String),
    #[error("user already exists")]
    Conflict,
    #[error("session ttl of {0} seconds is out of range")]
    SessionTtl(u64),
}

/// Where an account authenticates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuthSource {
    /// Username and password stored by gatehouse.
    Local,
    /// Federated account owned by the identity provider with this id.
    Provider(String),
}

impl AuthSource {
    pub const LOCAL: &'static str = "local";

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Local => Self::LOCAL,
            Self::Provider(id) => id,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == Self::LOCAL {
            Self::Local
        } else {
            Self::Provider(value.to_string())
        }
    }
}

/// Administrative privilege of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministratorRole {
    #[default]
    None,
    Standard,
    Super,
}

impl AdministratorRole {
    /// Stored representation; accounts without a role store an empty string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Standard => "standard",
            Self::Super => "super",
        }
    }

    /// Parse a stored role. Anything unrecognized grants no privilege.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "super" => Self::Super,
            "standard" => Self::Standard,
            _ => Self::None,
        }
    }
}

impl fmt::Display for AdministratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            role => f.write_str(role.as_str()),
        }
    }
}

/// Account as read from the credential store.
#[derive(Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub auth_source: AuthSource,
    pub administrator: AdministratorRole,
    password_hash: String,
}

impl UserRecord {
    #[must_use]
    pub fn new(
        id: Uuid,
        username: String,
        auth_source: AuthSource,
        administrator: AdministratorRole,
        password_hash: String,
    ) -> Self {
        Self {
            id,
            username,
            auth_source,
            administrator,
            password_hash,
        }
    }

    /// Check a plaintext password against the stored hash.
    #[must_use]
    pub fn verify_password(&self, password: &SecretString) -> bool {
        password::verify_password(&self.password_hash, password.expose_secret())
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("auth_source", &self.auth_source)
            .field("administrator", &self.administrator)
            .finish_non_exhaustive()
    }
}

/// Input for provisioning a local account.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: SecretString,
    pub administrator: AdministratorRole,
}

/// Server-side session bound to one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub persistent: bool,
}

/// A freshly created session and the raw token destined for the cookie.
///
/// The token is never stored; only its hash is.
#[derive(Debug)]
pub struct IssuedSession {
    pub handle: SessionHandle,
    pub token: String,
}

pub trait CredentialStore: Send + Sync {
    /// Find the local account with this username.
    ///
    /// Returns `Ok(None)` when no local account matches; federated accounts
    /// sharing the username are never returned.
    fn resolve_local_user<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>>;

    /// Create a local account, hashing its password.
    fn insert_user(&self, user: NewUser) -> StoreFuture<'_, Uuid>;

    /// Cheap liveness check used by `/health`.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

pub trait SessionStore: Send + Sync {
    fn create_session(&self, user_id: Uuid, persistent: bool) -> StoreFuture<'_, IssuedSession>;

    /// Resolve a raw cookie token into a live session, refreshing its activity.
    ///
    /// Unknown and expired tokens resolve to `Ok(None)`.
    fn lookup_session<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<SessionHandle>>;

    fn remove_session<'a>(&'a self, session: &'a SessionHandle) -> StoreFuture<'a, ()>;
}
