//! Request/response types for auth endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::providers::ProviderKind;

/// Login form posted to `/auth/session`.
#[derive(ToSchema, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthStateProvider {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub label: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthStateResponse {
    pub providers: Vec<AuthStateProvider>,
}

/// Body of every declined request.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorData {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::ExposeSecret;

    #[test]
    fn credentials_debug_hides_password() -> Result<()> {
        let credentials: Credentials =
            serde_json::from_str(r#"{"username":"admin","password":"hunter2"}"#)?;
        assert_eq!(credentials.password.expose_secret(), "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        Ok(())
    }

    #[test]
    fn credentials_require_both_fields() {
        assert!(serde_json::from_str::<Credentials>(r#"{"username":"admin"}"#).is_err());
    }

    #[test]
    fn provider_serializes_kind_as_type() -> Result<()> {
        let provider = AuthStateProvider {
            id: "p1".to_string(),
            kind: ProviderKind::Okta,
            label: "Corporate Okta".to_string(),
        };
        let value = serde_json::to_value(&provider)?;
        assert_eq!(value["type"], "okta");
        assert_eq!(value["label"], "Corporate Okta");
        Ok(())
    }
}
