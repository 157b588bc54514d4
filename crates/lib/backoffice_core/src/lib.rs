//! # backoffice_core
//!
//! Core domain logic for the reservation backoffice: token codec, password
//! hashing, CSRF nonces, domain models and the tenant-scoped stores.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
