//! Authentication domain models.
//!
//! These are internal domain models. The API layer projects `User` into its
//! own public shape so the password hash never reaches a response body.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staff role matching the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Accounting,
}

impl Role {
    /// Every role, highest privilege first.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Staff, Role::Accounting];

    /// Wire / database text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Staff => "STAFF",
            Role::Accounting => "ACCOUNTING",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Backing user record, owned by the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub phone_e164: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    /// Revocation version embedded in every refresh token minted for this user.
    pub refresh_token_version: i32,
}

/// Identity claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPayload {
    /// Subject (user id).
    pub sub: Uuid,
    #[serde(rename = "tenantId")]
    pub tenant_id: Uuid,
    pub role: Role,
    /// Anti-CSRF nonce the client must echo in `x-csrf-token`.
    pub csrf: String,
}

/// Full JWT claim set of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub payload: AccessPayload,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Identity claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPayload {
    pub sub: Uuid,
    #[serde(rename = "tenantId")]
    pub tenant_id: Uuid,
    pub role: Role,
    /// `refresh_token_version` of the user at mint time.
    pub v: i32,
}

/// Full JWT claim set of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(flatten)]
    pub payload: RefreshPayload,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated principal for a single request.
///
/// Built from a verified access token and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub csrf_nonce: String,
}

impl From<AccessClaims> for Identity {
    fn from(claims: AccessClaims) -> Self {
        let AccessPayload {
            sub,
            tenant_id,
            role,
            csrf,
        } = claims.payload;
        Self {
            user_id: sub,
            tenant_id,
            role,
            csrf_nonce: csrf,
        }
    }
}
