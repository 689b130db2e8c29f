pub mod logging;

use crate::gatehouse::store::MAX_SESSION_TTL_SECONDS;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_MEMORY_STORE: &str = "memory-store";
pub const ARG_AUTH_PROVIDERS: &str = "auth-providers";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_ADMIN_USERNAME: &str = "admin-username";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("gatehouse")
        .about("Administrator login gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("GATEHOUSE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("GATEHOUSE_DSN")
                .required_unless_present(ARG_MEMORY_STORE),
        )
        .arg(
            Arg::new(ARG_MEMORY_STORE)
                .long("memory-store")
                .help("Keep users and sessions in memory instead of Postgres")
                .env("GATEHOUSE_MEMORY_STORE")
                .action(ArgAction::SetTrue)
                .conflicts_with(ARG_DSN),
        );

    let command = with_auth_args(command);
    logging::with_args(command)
}

fn with_auth_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_PROVIDERS)
                .long("auth-providers")
                .help("Path to a JSON array of identity providers ({id, type, label})")
                .env("GATEHOUSE_AUTH_PROVIDERS")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long("session-ttl-seconds")
                .help("Session lifetime in seconds")
                .env("GATEHOUSE_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long("cookie-secure")
                .help("Mark session cookies Secure (requires HTTPS in front of gatehouse)")
                .env("GATEHOUSE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_ADMIN_USERNAME)
                .long("admin-username")
                .help("Create this super administrator at startup if it does not exist")
                .env("GATEHOUSE_ADMIN_USERNAME")
                .requires(ARG_ADMIN_PASSWORD),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long("admin-password")
                .help("Password for --admin-username")
                .env("GATEHOUSE_ADMIN_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_ADMIN_USERNAME),
        )
}
