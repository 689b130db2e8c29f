//! Identity provider discovery.
//!
//! Providers are loaded once at startup and never change afterwards; the
//! login page uses `/auth/state` to decide which sign-in buttons to render.

use anyhow::{bail, Context, Result};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

use super::{
    state::AuthState,
    types::{AuthStateProvider, AuthStateResponse},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Azure,
    AuthZero,
    OneLogin,
    Okta,
    JumpCloud,
    Saml,
    Oauth,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub label: String,
}

/// Ordered, read-only provider configuration.
#[derive(Clone, Debug, Default)]
pub struct Providers(Vec<ProviderDescriptor>);

impl Providers {
    /// # Errors
    /// Returns an error on empty or duplicate provider ids.
    pub fn new(providers: Vec<ProviderDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if provider.id.trim().is_empty() {
                bail!("Provider {:?} has an empty id", provider.label);
            }
            if !seen.insert(provider.id.as_str()) {
                bail!("Duplicate provider id: {}", provider.id);
            }
        }
        Ok(Self(providers))
    }

    /// Parse a JSON array of `{id, type, label}` objects.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let providers: Vec<ProviderDescriptor> =
            serde_json::from_str(json).context("Invalid auth providers JSON")?;
        Self::new(providers)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read auth providers file: {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[utoipa::path(
    get,
    path = "/auth/state",
    responses(
        (status = 200, description = "Configured identity providers", body = AuthStateResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state))]
pub async fn auth_state(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let providers = auth_state
        .providers()
        .iter()
        .map(|provider| AuthStateProvider {
            id: provider.id.clone(),
            kind: provider.kind,
            label: provider.label.clone(),
        })
        .collect();

    (StatusCode::OK, Json(AuthStateResponse { providers }))
}
