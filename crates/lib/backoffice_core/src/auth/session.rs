//! Session issuance: login, refresh, logout and forced revocation.
//!
//! Every successful login/refresh mints a fresh CSRF nonce first, then signs
//! the access token around it and a refresh token carrying the user's current
//! revocation version.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::csrf::new_csrf_nonce;
use super::jwt::TokenCodec;
use super::password::verify_password_async;
use super::{AuthError, revocation};
use crate::models::auth::{AccessPayload, Identity, RefreshPayload, User};
use crate::store::UserStore;

/// A freshly minted token pair plus the nonce bound into the access token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The user as read from the store during this call.
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_nonce: String,
}

/// Orchestrates the session lifecycle against the user store.
#[derive(Clone)]
pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserStore>,
}

impl SessionIssuer {
    pub fn new(codec: Arc<TokenCodec>, users: Arc<dyn UserStore>) -> Self {
        Self { codec, users }
    }

    /// Authenticate with email + password.
    ///
    /// Unknown email, inactive user and wrong password all fail with the same
    /// [`AuthError::CredentialError`].
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let email = email.to_lowercase();
        let Some(user) = self.users.find_active_by_email(&email).await? else {
            debug!("login rejected: no active user");
            return Err(AuthError::CredentialError);
        };

        if !verify_password_async(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::CredentialError);
        }

        info!(user_id = %user.id, tenant_id = %user.tenant_id, "login succeeded");
        self.issue(user)
    }

    /// Exchange a refresh token for a new token pair and nonce.
    ///
    /// The presented token stays valid until the user's revocation version
    /// advances; refresh itself never bumps the version.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedSession, AuthError> {
        let claims = self.codec.verify_refresh(refresh_token).map_err(|e| {
            debug!(error = %e, "refresh token rejected");
            AuthError::Unauthenticated
        })?;
        let RefreshPayload {
            sub, tenant_id, v, ..
        } = claims.payload;

        let user = self
            .users
            .find_active(tenant_id, sub)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !revocation::is_current(&user, v) {
            debug!(user_id = %user.id, claimed = v, "refresh token revoked");
            return Err(AuthError::Unauthenticated);
        }

        debug!(user_id = %user.id, "session refreshed");
        self.issue(user)
    }

    /// Revoke every refresh token of the calling user.
    pub async fn logout(&self, identity: &Identity) -> Result<i32, AuthError> {
        let version =
            revocation::advance(self.users.as_ref(), identity.tenant_id, identity.user_id)
                .await?
                .ok_or(AuthError::Unauthenticated)?;
        info!(user_id = %identity.user_id, version, "logged out");
        Ok(version)
    }

    /// Administrative revocation of another user's sessions within a tenant.
    pub async fn revoke_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<i32, AuthError> {
        let version = revocation::advance(self.users.as_ref(), tenant_id, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(%user_id, version, "sessions force-revoked");
        Ok(version)
    }

    /// Re-read the caller's user record; deactivated users are unauthenticated.
    pub async fn current_user(&self, identity: &Identity) -> Result<User, AuthError> {
        self.users
            .find_active(identity.tenant_id, identity.user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    fn issue(&self, user: User) -> Result<IssuedSession, AuthError> {
        let csrf_nonce = new_csrf_nonce();
        let access_token = self.codec.sign_access(&AccessPayload {
            sub: user.id,
            tenant_id: user.tenant_id,
            role: user.role,
            csrf: csrf_nonce.clone(),
        })?;
        let refresh_token = self.codec.sign_refresh(&RefreshPayload {
            sub: user.id,
            tenant_id: user.tenant_id,
            role: user.role,
            v: user.refresh_token_version,
        })?;
        Ok(IssuedSession {
            user,
            access_token,
            refresh_token,
            csrf_nonce,
        })
    }
}
