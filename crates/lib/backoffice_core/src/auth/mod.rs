//! Authentication and session logic.
//!
//! Token codec, password hashing, CSRF nonces, the revocation ledger and the
//! session issuer that ties them to the user store.

pub mod csrf;
pub mod jwt;
pub mod password;
pub mod revocation;
pub mod session;

use thiserror::Error;

use crate::store::StoreError;

/// Token codec errors.
///
/// The API boundary collapses every variant into one "unauthenticated"
/// outcome; the distinction only exists for logs and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("jwt encode: {0}")]
    Encode(String),

    #[error("token codec misconfigured: {0}")]
    Config(String),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, inactive user or wrong password; never distinguished.
    #[error("Invalid credentials")]
    CredentialError,

    /// Missing/invalid/expired/revoked token or deactivated user.
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("User not found")]
    UserNotFound,

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
