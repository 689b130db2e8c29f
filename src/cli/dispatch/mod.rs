//! Map validated CLI arguments to the action the binary executes.

use crate::cli::{
    actions::{
        server::{Args, BootstrapAdmin, StoreBackend},
        Action,
    },
    commands::{
        ARG_ADMIN_PASSWORD, ARG_ADMIN_USERNAME, ARG_AUTH_PROVIDERS, ARG_COOKIE_SECURE, ARG_DSN,
        ARG_MEMORY_STORE, ARG_PORT, ARG_SESSION_TTL_SECONDS,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let store = if matches.get_flag(ARG_MEMORY_STORE) {
        StoreBackend::Memory
    } else {
        StoreBackend::Postgres {
            dsn: matches
                .get_one::<String>(ARG_DSN)
                .cloned()
                .context("missing required argument: --dsn")?,
        }
    };

    let bootstrap_admin = match (
        matches.get_one::<String>(ARG_ADMIN_USERNAME),
        matches.get_one::<String>(ARG_ADMIN_PASSWORD),
    ) {
        (Some(username), Some(password)) => Some(BootstrapAdmin {
            username: username.clone(),
            password: SecretString::from(password.clone()),
        }),
        (None, None) => None,
        _ => anyhow::bail!("--admin-username and --admin-password must be used together"),
    };

    Ok(Action::Server(Args {
        port,
        store,
        auth_providers: matches.get_one::<std::path::PathBuf>(ARG_AUTH_PROVIDERS).cloned(),
        session_ttl_seconds: matches
            .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .context("missing required argument: --session-ttl-seconds")?,
        cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        bootstrap_admin,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    const ENV_VARS: [&str; 7] = [
        "GATEHOUSE_PORT",
        "GATEHOUSE_DSN",
        "GATEHOUSE_MEMORY_STORE",
        "GATEHOUSE_AUTH_PROVIDERS",
        "GATEHOUSE_COOKIE_SECURE",
        "GATEHOUSE_ADMIN_USERNAME",
        "GATEHOUSE_ADMIN_PASSWORD",
    ];

    #[test]
    fn postgres_backend_from_dsn() -> Result<()> {
        temp_env::with_vars_unset(ENV_VARS, || {
            let matches = commands::new().get_matches_from(vec![
                "gatehouse",
                "--dsn",
                "postgres://localhost/gatehouse",
                "--auth-providers",
                "/etc/gatehouse/providers.json",
            ]);
            let Action::Server(args) = handler(&matches)?;
            assert!(matches!(
                args.store,
                StoreBackend::Postgres { ref dsn } if dsn == "postgres://localhost/gatehouse"
            ));
            assert_eq!(args.port, 8080);
            assert_eq!(
                args.auth_providers,
                Some(std::path::PathBuf::from("/etc/gatehouse/providers.json"))
            );
            assert!(!args.cookie_secure);
            assert!(args.bootstrap_admin.is_none());
            Ok(())
        })
    }

    #[test]
    fn memory_backend_with_bootstrap_admin() -> Result<()> {
        temp_env::with_vars_unset(ENV_VARS, || {
            let matches = commands::new().get_matches_from(vec![
                "gatehouse",
                "--memory-store",
                "--cookie-secure",
                "--admin-username",
                "admin",
                "--admin-password",
                "correct",
                "--session-ttl-seconds",
                "60",
            ]);
            let Action::Server(args) = handler(&matches)?;
            assert!(matches!(args.store, StoreBackend::Memory));
            assert!(args.cookie_secure);
            assert_eq!(args.session_ttl_seconds, 60);
            let admin = args.bootstrap_admin.context("missing bootstrap admin")?;
            assert_eq!(admin.username, "admin");
            assert_eq!(admin.password.expose_secret(), "correct");
            Ok(())
        })
    }
}
