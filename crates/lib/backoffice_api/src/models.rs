//! Request and response bodies.

use backoffice_core::models::FieldErrors;
use backoffice_core::models::auth::{Role, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 6;

/// `POST /auth/login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Shape checks only; credential checks happen in the session issuer.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            errors
                .entry("email".into())
                .or_default()
                .push("must be a valid email address".into());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors
                .entry("password".into())
                .or_default()
                .push(format!("must be at least {MIN_PASSWORD_LEN} characters"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// User fields safe to return to the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_e164: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            tenant_id: u.tenant_id,
            name: u.name,
            email: u.email,
            phone_e164: u.phone_e164,
            role: u.role,
            is_active: u.is_active,
        }
    }
}

/// Returned by login and refresh. Tokens travel only in cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserPublic,
    pub csrf_token: String,
}

/// `GET /auth/me` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserPublic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /admin/users/{id}/revoke-sessions` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub ok: bool,
    pub refresh_token_version: i32,
}

/// Generic `{ "data": ... }` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
