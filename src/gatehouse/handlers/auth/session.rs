//! Session cookies and the `ActiveSession` extractor.
//!
//! Flow Overview: login asks the session store for a new session and sends
//! its token back as an `HttpOnly` cookie. Later requests present the cookie;
//! `ActiveSession` hashes the token, resolves it through the store and hands
//! the typed session to the handler. Missing or expired sessions are rejected
//! before the handler runs.

use axum::{
    extract::FromRequestParts,
    http::{
        header::{InvalidHeaderValue, COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    error::AuthError,
    state::{AuthConfig, AuthState},
};
use crate::gatehouse::store::SessionHandle;

pub const SESSION_COOKIE_NAME: &str = "gatehouse-session";

/// Session resolved from the request cookie.
#[derive(Clone, Debug)]
pub struct ActiveSession(pub SessionHandle);

impl<S> FromRequestParts<S> for ActiveSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<Arc<AuthState>>()
            .cloned()
            .ok_or_else(|| AuthError::Internal("auth state extension missing".to_string()))?;

        match authenticate_session(&parts.headers, &auth_state).await? {
            Some(session) => Ok(Self(session)),
            None => Err(AuthError::AuthenticationRequired),
        }
    }
}

/// Resolve the session cookie into a live session, if any.
///
/// # Errors
/// Returns `AuthError::Internal` when the session store fails.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Option<SessionHandle>, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let session = auth_state.sessions().lookup_session(&token).await?;
    if session.is_none() {
        debug!("Session cookie did not resolve to a live session");
    }
    Ok(session)
}

/// Ask the session store for a new session and build the cookie that binds it.
///
/// Nothing is returned to the caller until the store has committed the session,
/// and a session whose cookie cannot be built is removed again.
pub(crate) async fn issue_session(
    auth_state: &AuthState,
    user_id: Uuid,
    persistent: bool,
) -> Result<(SessionHandle, HeaderValue), AuthError> {
    let issued = auth_state
        .sessions()
        .create_session(user_id, persistent)
        .await?;
    match session_cookie(auth_state.config(), &issued.token, persistent) {
        Ok(cookie) => Ok((issued.handle, cookie)),
        Err(err) => {
            // The caller never sees this token, so the session must not outlive the request.
            if let Err(remove_err) = auth_state.sessions().remove_session(&issued.handle).await {
                warn!(
                    session_id = %issued.handle.id,
                    "Failed to remove unusable session: {remove_err}"
                );
            }
            Err(AuthError::Internal(format!("invalid session cookie: {err}")))
        }
    }
}

/// Build the `Set-Cookie` value for a session token.
///
/// Persistent sessions outlive the browser via `Max-Age`; the others end with it.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
    persistent: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    if persistent {
        cookie.push_str(&format!("; Max-Age={}", config.session_ttl_seconds()));
    }
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            let val = val.trim();
            (key.trim() == SESSION_COOKIE_NAME && !val.is_empty()).then(|| val.to_string())
        })
}
