//! Local super administrator login.
//!
//! Flow Overview: parse credentials, resolve the local account, verify the
//! password, require the super administrator role, then issue a persistent
//! session. Each step only runs once the previous one succeeded, and no
//! session exists until every check has passed.
//!
//! Security boundaries: an unknown username and a wrong password produce the
//! same `auth_invalid` response. A correct password on an account without
//! the super role produces `unauthorized` instead.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    error::AuthError,
    session::issue_session,
    state::AuthState,
    types::{Credentials, ErrorData},
};
use crate::gatehouse::store::{AdministratorRole, UserRecord};

/// Every login session outlives the browser; callers cannot opt out.
const PERSISTENT_SESSIONS: bool = true;

/// Run the credential and privilege checks without touching the session store.
///
/// # Errors
/// `AuthInvalid` for an unknown user or wrong password, `Unauthorized` for a
/// non-super account, `Internal` when the credential store fails.
pub async fn authenticate(
    auth_state: &AuthState,
    credentials: &Credentials,
) -> Result<UserRecord, AuthError> {
    let Some(user) = auth_state
        .credentials()
        .resolve_local_user(&credentials.username)
        .await?
    else {
        debug!("Login declined: unknown local user");
        return Err(AuthError::AuthInvalid);
    };

    if !user.verify_password(&credentials.password) {
        debug!(user_id = %user.id, "Login declined: password mismatch");
        return Err(AuthError::AuthInvalid);
    }

    if user.administrator != AdministratorRole::Super {
        debug!(
            user_id = %user.id,
            administrator = %user.administrator,
            "Login declined: not a super administrator"
        );
        return Err(AuthError::Unauthorized);
    }

    Ok(user)
}

#[utoipa::path(
    post,
    path = "/auth/session",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login success, session cookie set"),
        (status = 401, description = "Invalid credentials or insufficient privilege", body = ErrorData),
        (status = 500, description = "Internal failure")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn auth_session(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Response {
    match login(&auth_state, payload).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn login(
    auth_state: &AuthState,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(credentials) =
        payload.map_err(|rejection| AuthError::RequestMalformed(rejection.body_text()))?;

    let user = authenticate(auth_state, &credentials).await?;

    let (session, cookie) = issue_session(auth_state, user.id, PERSISTENT_SESSIONS).await?;
    info!(
        user_id = %user.id,
        session_id = %session.id,
        "Super administrator logged in"
    );

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatehouse::{
        handlers::auth::providers::Providers,
        handlers::auth::state::AuthConfig,
        store::{CredentialStore, MemoryStore, NewUser},
    };
    use anyhow::Result;
    use secrecy::SecretString;
    use std::time::Duration;

    async fn state_with(users: &[(&str, &str, AdministratorRole)]) -> Result<AuthState> {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(60)));
        for (username, password, role) in users {
            store
                .insert_user(NewUser {
                    username: (*username).to_string(),
                    password: SecretString::from((*password).to_string()),
                    administrator: *role,
                })
                .await?;
        }
        Ok(AuthState::new(
            AuthConfig::new(),
            Providers::default(),
            store.clone(),
            store,
        ))
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        }
    }

    #[tokio::test]
    async fn authenticate_accepts_super_administrator() -> Result<()> {
        let state = state_with(&[("admin", "correct", AdministratorRole::Super)]).await?;
        let user = authenticate(&state, &credentials("admin", "correct")).await?;
        assert_eq!(user.username, "admin");
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_merges_unknown_user_and_wrong_password() -> Result<()> {
        let state = state_with(&[("admin", "correct", AdministratorRole::Super)]).await?;
        let wrong = authenticate(&state, &credentials("admin", "wrong")).await;
        let ghost = authenticate(&state, &credentials("ghost", "correct")).await;
        assert!(matches!(wrong, Err(AuthError::AuthInvalid)));
        assert!(matches!(ghost, Err(AuthError::AuthInvalid)));
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_rejects_lower_roles_after_password_check() -> Result<()> {
        let state = state_with(&[
            ("staff", "correct", AdministratorRole::Standard),
            ("viewer", "correct", AdministratorRole::None),
        ])
        .await?;
        for username in ["staff", "viewer"] {
            let result = authenticate(&state, &credentials(username, "correct")).await;
            assert!(matches!(result, Err(AuthError::Unauthorized)));
            // A wrong password is still reported as invalid credentials.
            let result = authenticate(&state, &credentials(username, "wrong")).await;
            assert!(matches!(result, Err(AuthError::AuthInvalid)));
        }
        Ok(())
    }
}
