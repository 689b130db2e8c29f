use crate::gatehouse::{
    self,
    handlers::auth::{AuthConfig, AuthState, Providers},
    store::{
        AdministratorRole, CredentialStore, MemoryStore, NewUser, PgStore, SessionStore,
        StoreError,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub enum StoreBackend {
    Postgres { dsn: String },
    Memory,
}

#[derive(Debug)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub store: StoreBackend,
    pub auth_providers: Option<PathBuf>,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store or provider list cannot be loaded, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let session_ttl = Duration::from_secs(args.session_ttl_seconds);

    let (credentials, sessions): (Arc<dyn CredentialStore>, Arc<dyn SessionStore>) =
        match args.store {
            StoreBackend::Postgres { dsn } => {
                let pool = PgPoolOptions::new()
                    .min_connections(1)
                    .max_connections(5)
                    .max_lifetime(Duration::from_secs(60 * 2))
                    .test_before_acquire(true)
                    .connect(&dsn)
                    .await
                    .context("Failed to connect to database")?;
                let store = Arc::new(PgStore::new(pool, session_ttl));
                (store.clone(), store)
            }
            StoreBackend::Memory => {
                warn!("using in-memory store, users and sessions are lost on restart");
                let store = Arc::new(MemoryStore::new(session_ttl));
                (store.clone(), store)
            }
        };

    let providers = match &args.auth_providers {
        Some(path) => Providers::from_json_file(path)?,
        None => Providers::default(),
    };
    info!(providers = providers.len(), "loaded auth providers");

    if let Some(admin) = args.bootstrap_admin {
        bootstrap_admin(credentials.as_ref(), admin).await?;
    }

    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_cookie_secure(args.cookie_secure);

    let auth_state = Arc::new(AuthState::new(
        auth_config,
        providers,
        credentials,
        sessions,
    ));

    gatehouse::new(args.port, auth_state).await
}

/// Create the configured super administrator unless the username is already taken.
async fn bootstrap_admin(store: &dyn CredentialStore, admin: BootstrapAdmin) -> Result<()> {
    let username = admin.username.clone();
    let user = NewUser {
        username: admin.username,
        password: admin.password,
        administrator: AdministratorRole::Super,
    };

    match store.insert_user(user).await {
        Ok(id) => {
            info!(%id, username = %username, "created bootstrap administrator");
            Ok(())
        }
        Err(StoreError::Conflict) => {
            info!(username = %username, "bootstrap administrator already exists");
            Ok(())
        }
        Err(err) => Err(err).context("Failed to create bootstrap administrator"),
    }
}
