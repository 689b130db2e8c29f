//! Session teardown.

use axum::{
    extract::Extension,
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    error::AuthError,
    session::{clear_session_cookie, ActiveSession},
    state::{AuthState, LOGIN_PATH},
};

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Session removed, redirect to the login page"),
        (status = 401, description = "No active session", body = super::types::ErrorData),
        (status = 500, description = "Session could not be removed")
    ),
    tag = "auth"
)]
#[instrument(skip_all, fields(session_id = %session.0.id))]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
    session: ActiveSession,
) -> Result<Response, AuthError> {
    let ActiveSession(session) = session;

    // A failed removal leaves the session active; report it instead of redirecting.
    auth_state.sessions().remove_session(&session).await?;
    info!(user_id = %session.user_id, "Session removed");

    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_static(LOGIN_PATH));
    match clear_session_cookie(auth_state.config()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => warn!("Failed to build clearing cookie: {err}"),
    }

    Ok((StatusCode::FOUND, headers).into_response())
}
