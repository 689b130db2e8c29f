//! Auth handlers and supporting modules.
//!
//! This module covers provider discovery (`GET /auth/state`), local super
//! administrator login (`POST /auth/session`) and logout (`GET /logout`).
//!
//! ## Declined logins
//!
//! | Situation                                  | Status | `error`        |
//! |--------------------------------------------|--------|----------------|
//! | unknown username / wrong password          | 401    | `auth_invalid` |
//! | correct password, not a super administrator| 401    | `unauthorized` |
//! | malformed body / store failure             | 500    | (no body)      |
//!
//! There is no attempt limiting or lockout at this layer.

mod error;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod providers;
pub(crate) mod session;
mod state;
pub(crate) mod types;

pub use error::AuthError;
pub use login::authenticate;
pub use providers::{ProviderDescriptor, ProviderKind, Providers};
pub use session::{ActiveSession, SESSION_COOKIE_NAME};
pub use state::{AuthConfig, AuthState, LOGIN_PATH};
pub use types::{AuthStateResponse, Credentials, ErrorData};
