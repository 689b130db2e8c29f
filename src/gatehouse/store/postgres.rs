//! Postgres-backed credential and session storage.

use secrecy::ExposeSecret;
use sqlx::{Connection, PgPool, Row};
use std::time::Duration;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::{
    generate_session_token, hash_session_token, AdministratorRole, AuthSource, CredentialStore,
    IssuedSession, NewUser, SessionHandle, SessionStore, StoreError, StoreFuture, UserRecord,
    MAX_SESSION_TTL_SECONDS,
};
use crate::gatehouse::password::hash_password;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    session_ttl: Duration,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    /// TTL bound as a query parameter; anything Postgres cannot add to `NOW()` is rejected.
    fn session_ttl_seconds(&self) -> Result<i64, StoreError> {
        let seconds = self.session_ttl.as_secs();
        if seconds > MAX_SESSION_TTL_SECONDS {
            return Err(StoreError::SessionTtl(seconds));
        }
        i64::try_from(seconds).map_err(|_| StoreError::SessionTtl(seconds))
    }

    async fn prune_expired_sessions(&self) -> Result<u64, StoreError> {
        let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_local_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = r"
            SELECT id, username, auth_source, administrator, password_hash
            FROM users
            WHERE auth_source = $1 AND username = $2
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(AuthSource::LOCAL)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| {
            UserRecord::new(
                row.get("id"),
                row.get("username"),
                AuthSource::parse(row.get::<&str, _>("auth_source")),
                AdministratorRole::parse(row.get::<&str, _>("administrator")),
                row.get("password_hash"),
            )
        }))
    }

    async fn create_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let password_hash = hash_password(user.password.expose_secret())?;
        let query = r"
            INSERT INTO users
                (username, auth_source, administrator, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.username)
            .bind(AuthSource::LOCAL)
            .bind(user.administrator.as_str())
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(row.get("id")),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        persistent: bool,
    ) -> Result<IssuedSession, StoreError> {
        let ttl_seconds = self.session_ttl_seconds()?;
        let pruned = self.prune_expired_sessions().await?;
        if pruned > 0 {
            debug!(pruned, "Removed expired sessions");
        }

        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);

        let query = r"
            INSERT INTO sessions
                (user_id, token_hash, persistent, expires_at)
            VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(persistent)
            .bind(ttl_seconds)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(IssuedSession {
            handle: SessionHandle {
                id: row.get("id"),
                user_id,
                persistent,
            },
            token,
        })
    }

    async fn touch_session(&self, token: &str) -> Result<Option<SessionHandle>, StoreError> {
        let token_hash = hash_session_token(token);
        let query = r"
            UPDATE sessions
            SET last_active_at = NOW()
            WHERE token_hash = $1 AND expires_at > NOW()
            RETURNING id, user_id, persistent
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| SessionHandle {
            id: row.get("id"),
            user_id: row.get("user_id"),
            persistent: row.get("persistent"),
        }))
    }

    async fn delete_session(&self, session: &SessionHandle) -> Result<(), StoreError> {
        let query = "DELETE FROM sessions WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(session.id)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn ping_database(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

impl CredentialStore for PgStore {
    fn resolve_local_user<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
        Box::pin(self.find_local_user(username))
    }

    fn insert_user(&self, user: NewUser) -> StoreFuture<'_, Uuid> {
        Box::pin(self.create_user(user))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.ping_database())
    }
}

impl SessionStore for PgStore {
    fn create_session(&self, user_id: Uuid, persistent: bool) -> StoreFuture<'_, IssuedSession> {
        Box::pin(self.insert_session(user_id, persistent))
    }

    fn lookup_session<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<SessionHandle>> {
        Box::pin(self.touch_session(token))
    }

    fn remove_session<'a>(&'a self, session: &'a SessionHandle) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_session(session))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
