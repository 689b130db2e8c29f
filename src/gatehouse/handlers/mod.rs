//! Route handlers for the gatehouse API.

pub mod auth;
pub mod health;
