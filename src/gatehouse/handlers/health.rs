use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::auth::AuthState;
use crate::GIT_COMMIT_HASH;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    store: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Credential store is healthy", body = Health),
        (status = 503, description = "Credential store is unhealthy", body = Health)
    ),
    tag= "health"
)]
#[instrument(skip(auth_state))]
pub async fn health(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let status = match auth_state.credentials().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            error!("Credential store ping failed: {err}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if status.is_success() { "ok" } else { "error" }.to_string(),
    };

    let short_hash = GIT_COMMIT_HASH.get(0..7).unwrap_or_default();

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )) {
        headers.insert("X-App", value);
    }

    (status, headers, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatehouse::{
        handlers::auth::{AuthConfig, Providers},
        store::{
            CredentialStore, MemoryStore, NewUser, StoreError, StoreFuture, UserRecord,
        },
    };
    use anyhow::{Context, Result};
    use axum::body::to_bytes;
    use std::time::Duration;
    use uuid::Uuid;

    struct DownStore;

    impl CredentialStore for DownStore {
        fn resolve_local_user<'a>(
            &'a self,
            _username: &'a str,
        ) -> StoreFuture<'a, Option<UserRecord>> {
            Box::pin(async { Err(StoreError::Token("down".to_string())) })
        }

        fn insert_user(&self, _user: NewUser) -> StoreFuture<'_, Uuid> {
            Box::pin(async { Err(StoreError::Token("down".to_string())) })
        }

        fn ping(&self) -> StoreFuture<'_, ()> {
            Box::pin(async { Err(StoreError::Token("down".to_string())) })
        }
    }

    fn state(credentials: Arc<dyn CredentialStore>) -> Extension<Arc<AuthState>> {
        let sessions = Arc::new(MemoryStore::new(Duration::from_secs(60)));
        Extension(Arc::new(AuthState::new(
            AuthConfig::new(),
            Providers::default(),
            credentials,
            sessions,
        )))
    }

    #[tokio::test]
    async fn health_reports_ok_store() -> Result<()> {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(60)));
        let response = health(state(store)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let app = response
            .headers()
            .get("X-App")
            .context("missing X-App header")?
            .to_str()?
            .to_string();
        assert!(app.starts_with(env!("CARGO_PKG_NAME")));

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["store"], "ok");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_unavailable_store() -> Result<()> {
        let response = health(state(Arc::new(DownStore))).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["store"], "error");
        Ok(())
    }
}
