//! Declined and failed auth outcomes.
//!
//! `AuthInvalid`, `Unauthorized` and `AuthenticationRequired` are expected
//! outcomes rendered as JSON with a stable code. Everything else becomes a
//! bare 500; the detail only goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use super::types::ErrorData;
use crate::gatehouse::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed request: {0}")]
    RequestMalformed(String),
    /// Unknown username or wrong password; deliberately indistinguishable.
    #[error("authentication credentials are invalid")]
    AuthInvalid,
    /// Valid credentials without super administrator privilege.
    #[error("not authorized")]
    Unauthorized,
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl AuthError {
    /// Stable error code for declined requests, `None` for fatal failures.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::AuthInvalid => Some("auth_invalid"),
            Self::Unauthorized => Some("unauthorized"),
            Self::AuthenticationRequired => Some("authentication_required"),
            Self::RequestMalformed(_) | Self::Internal(_) => None,
        }
    }

    const fn message(&self) -> &'static str {
        match self {
            Self::AuthInvalid => "Authentication credentials are invalid",
            Self::Unauthorized => "Not authorized",
            Self::AuthenticationRequired => "Authentication required",
            Self::RequestMalformed(_) | Self::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self.code() {
            Some(code) => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorData {
                    error: code.to_string(),
                    message: self.message().to_string(),
                }),
            )
                .into_response(),
            None => {
                error!("Request aborted: {self}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;

    async fn body_of(err: AuthError) -> Result<(StatusCode, Vec<u8>)> {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, body.to_vec()))
    }

    #[tokio::test]
    async fn auth_invalid_renders_stable_code() -> Result<()> {
        let (status, body) = body_of(AuthError::AuthInvalid).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let data: ErrorData = serde_json::from_slice(&body)?;
        assert_eq!(data.error, "auth_invalid");
        assert_eq!(data.message, "Authentication credentials are invalid");
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_renders_distinct_code() -> Result<()> {
        let (status, body) = body_of(AuthError::Unauthorized).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let data: ErrorData = serde_json::from_slice(&body)?;
        assert_eq!(data.error, "unauthorized");
        assert_eq!(data.message, "Not authorized");
        Ok(())
    }

    #[tokio::test]
    async fn internal_failures_do_not_leak_detail() -> Result<()> {
        let (status, body) =
            body_of(AuthError::Internal("connection refused to 10.0.0.5".into())).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());

        let (status, body) = body_of(AuthError::RequestMalformed("EOF".into())).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
        Ok(())
    }

    #[test]
    fn store_errors_become_internal() {
        let err = AuthError::from(StoreError::Conflict);
        assert!(matches!(err, AuthError::Internal(_)));
        assert_eq!(err.code(), None);
    }
}
