//! Revocation ledger.
//!
//! One integer per user (`refresh_token_version`). Refresh tokens embed the
//! value at mint time; advancing it invalidates every outstanding refresh
//! token for that user at once.

use uuid::Uuid;

use crate::models::auth::User;
use crate::store::{StoreError, UserStore};

/// Whether a refresh token minted at `claimed_version` is still honoured.
pub fn is_current(user: &User, claimed_version: i32) -> bool {
    user.refresh_token_version == claimed_version
}

/// Atomically advance the user's version, returning the new value.
///
/// `None` when no such user exists in `tenant_id`.
pub async fn advance(
    users: &dyn UserStore,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<Option<i32>, StoreError> {
    users.bump_refresh_token_version(tenant_id, user_id).await
}
