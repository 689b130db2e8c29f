//! Auth state and configuration shared by every handler.

use std::sync::Arc;

use super::providers::Providers;
use crate::gatehouse::store::{CredentialStore, SessionStore};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;
pub const LOGIN_PATH: &str = "/login";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// Immutable snapshot handed to every request through an `Extension`.
pub struct AuthState {
    config: AuthConfig,
    providers: Providers,
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        providers: Providers,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            providers,
            credentials,
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub(crate) fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}
