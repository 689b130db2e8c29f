//! # Gatehouse (administrator login gateway)
//!
//! `gatehouse` fronts the administration console of an access gateway. It
//! advertises the configured identity providers, authenticates local
//! super administrators with a username and password, issues a persistent
//! session cookie and tears the session down again on logout.
//!
//! ## Login
//!
//! Unknown usernames and wrong passwords are reported with the same
//! `auth_invalid` error so callers cannot probe for accounts. Valid
//! credentials for an account that is not a super administrator are rejected
//! with the distinct `unauthorized` error.
//!
//! ## Sessions
//!
//! Session cookies carry a random token; only its SHA-256 hash is stored.

pub mod cli;
pub mod gatehouse;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
