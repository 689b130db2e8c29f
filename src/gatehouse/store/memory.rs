//! In-process credential and session storage.
//!
//! Nothing survives a restart. Used by tests and by `--memory-store`.

use secrecy::ExposeSecret;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    generate_session_token, hash_session_token, AuthSource, CredentialStore, IssuedSession,
    NewUser, SessionHandle, SessionStore, StoreError, StoreFuture, UserRecord,
};
use crate::gatehouse::password::hash_password;

struct StoredSession {
    handle: SessionHandle,
    expires_at: Instant,
    last_active: Instant,
}

pub struct MemoryStore {
    /// Keyed by `(auth source, username)`.
    users: RwLock<HashMap<(String, String), UserRecord>>,
    /// Keyed by the SHA-256 hash of the session token.
    sessions: RwLock<HashMap<Vec<u8>, StoredSession>>,
    session_ttl: Duration,
}

impl MemoryStore {
    #[must_use]
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            users: RwLock::default(),
            sessions: RwLock::default(),
            session_ttl,
        }
    }

    /// Insert a pre-built record, e.g. a federated account.
    pub async fn put_user(&self, user: UserRecord) {
        let key = (user.auth_source.as_str().to_string(), user.username.clone());
        self.users.write().await.insert(key, user);
    }

    /// Live sessions bound to a user.
    pub async fn sessions_for(&self, user_id: Uuid) -> Vec<SessionHandle> {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|stored| stored.handle.user_id == user_id && stored.expires_at > now)
            .map(|stored| stored.handle.clone())
            .collect()
    }

    /// When the session was last resolved from its cookie.
    pub async fn last_active(&self, session_id: Uuid) -> Option<Instant> {
        self.sessions
            .read()
            .await
            .values()
            .find(|stored| stored.handle.id == session_id)
            .map(|stored| stored.last_active)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn add_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let key = (AuthSource::LOCAL.to_string(), user.username.clone());
        if self.users.read().await.contains_key(&key) {
            return Err(StoreError::Conflict);
        }

        let password_hash = hash_password(user.password.expose_secret())?;
        let id = Uuid::new_v4();
        let record = UserRecord::new(
            id,
            user.username,
            AuthSource::Local,
            user.administrator,
            password_hash,
        );

        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        users.insert(key, record);
        Ok(id)
    }

    async fn find_local_user(&self, username: &str) -> Option<UserRecord> {
        let key = (AuthSource::LOCAL.to_string(), username.to_string());
        self.users.read().await.get(&key).cloned()
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        persistent: bool,
    ) -> Result<IssuedSession, StoreError> {
        let token = generate_session_token()?;
        let handle = SessionHandle {
            id: Uuid::new_v4(),
            user_id,
            persistent,
        };
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.session_ttl)
            .ok_or(StoreError::SessionTtl(self.session_ttl.as_secs()))?;

        let mut sessions = self.sessions.write().await;
        // Abandoned sessions are never looked up again; drop them here.
        sessions.retain(|_, stored| stored.expires_at > now);
        sessions.insert(
            hash_session_token(&token),
            StoredSession {
                handle: handle.clone(),
                expires_at,
                last_active: now,
            },
        );
        Ok(IssuedSession { handle, token })
    }

    async fn touch_session(&self, token: &str) -> Option<SessionHandle> {
        let token_hash = hash_session_token(token);
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let expired = sessions
            .get(&token_hash)
            .is_some_and(|stored| stored.expires_at <= now);
        if expired {
            sessions.remove(&token_hash);
            return None;
        }
        sessions.get_mut(&token_hash).map(|stored| {
            stored.last_active = now;
            stored.handle.clone()
        })
    }

    async fn delete_session(&self, session: &SessionHandle) {
        self.sessions
            .write()
            .await
            .retain(|_, stored| stored.handle.id != session.id);
    }
}

impl CredentialStore for MemoryStore {
    fn resolve_local_user<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
        Box::pin(async move { Ok(self.find_local_user(username).await) })
    }

    fn insert_user(&self, user: NewUser) -> StoreFuture<'_, Uuid> {
        Box::pin(self.add_user(user))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

impl SessionStore for MemoryStore {
    fn create_session(&self, user_id: Uuid, persistent: bool) -> StoreFuture<'_, IssuedSession> {
        Box::pin(self.insert_session(user_id, persistent))
    }

    fn lookup_session<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<SessionHandle>> {
        Box::pin(async move { Ok(self.touch_session(token).await) })
    }

    fn remove_session<'a>(&'a self, session: &'a SessionHandle) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.delete_session(session).await;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatehouse::store::AdministratorRole;
    use anyhow::{Context, Result};
    use secrecy::SecretString;

    fn new_user(username: &str, role: AdministratorRole) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: SecretString::from("correct".to_string()),
            administrator: role,
        }
    }

    #[tokio::test]
    async fn insert_then_resolve_local_user() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(60));
        let id = store
            .insert_user(new_user("admin", AdministratorRole::Super))
            .await?;

        let record = store
            .resolve_local_user("admin")
            .await?
            .context("missing user")?;
        assert_eq!(record.id, id);
        assert_eq!(record.administrator, AdministratorRole::Super);
        assert!(record.verify_password(&SecretString::from("correct".to_string())));
        assert!(store.resolve_local_user("ghost").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(60));
        store
            .insert_user(new_user("admin", AdministratorRole::Super))
            .await?;
        let result = store
            .insert_user(new_user("admin", AdministratorRole::None))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict)));
        Ok(())
    }

    #[tokio::test]
    async fn federated_users_are_not_resolved_locally() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(60));
        store
            .put_user(UserRecord::new(
                Uuid::new_v4(),
                "alice".to_string(),
                AuthSource::Provider("okta-1".to_string()),
                AdministratorRole::Super,
                String::new(),
            ))
            .await;
        assert!(store.resolve_local_user("alice").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn session_lifecycle() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(60));
        let user_id = Uuid::new_v4();
        let issued = store.create_session(user_id, true).await?;

        let found = store
            .lookup_session(&issued.token)
            .await?
            .context("missing session")?;
        assert_eq!(found, issued.handle);
        let touched = store
            .last_active(found.id)
            .await
            .context("missing activity")?;
        assert!(touched.elapsed() < Duration::from_secs(5));
        assert_eq!(store.sessions_for(user_id).await.len(), 1);

        store.remove_session(&found).await?;
        assert!(store.lookup_session(&issued.token).await?.is_none());
        assert_eq!(store.session_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() -> Result<()> {
        let store = MemoryStore::new(Duration::ZERO);
        let issued = store.create_session(Uuid::new_v4(), true).await?;
        assert!(store.lookup_session(&issued.token).await?.is_none());
        assert_eq!(store.session_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn create_session_sweeps_abandoned_sessions() -> Result<()> {
        let store = MemoryStore::new(Duration::ZERO);
        let user_id = Uuid::new_v4();
        store.create_session(user_id, true).await?;
        store.create_session(user_id, true).await?;
        store.create_session(user_id, true).await?;
        // Only the session created last survives; earlier ones were never looked up.
        assert_eq!(store.session_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn create_session_keeps_live_sessions() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(60));
        let first = store.create_session(Uuid::new_v4(), true).await?;
        store.create_session(Uuid::new_v4(), true).await?;
        assert_eq!(store.session_count().await, 2);
        assert!(store.lookup_session(&first.token).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn oversized_ttl_fails_instead_of_overflowing() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(u64::MAX));
        let result = store.create_session(Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(StoreError::SessionTtl(u64::MAX))));
        assert_eq!(store.session_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_does_not_resolve() -> Result<()> {
        let store = MemoryStore::new(Duration::from_secs(60));
        assert!(store.lookup_session("nope").await?.is_none());
        Ok(())
    }
}
