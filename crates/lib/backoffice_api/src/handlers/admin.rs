//! Administrative handlers.

use axum::Json;
use axum::extract::{Extension, Path, State};
use backoffice_core::models::auth::Identity;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::RevokeResponse;

/// `POST /admin/users/{id}/revoke-sessions`: invalidate every refresh token
/// of a user in the caller's tenant.
pub async fn revoke_sessions_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<RevokeResponse>> {
    let user_id = Uuid::parse_str(&id).map_err(|_| AppError::NotFound)?;
    let version = state
        .sessions
        .revoke_user(identity.tenant_id, user_id)
        .await?;
    info!(actor = %identity.user_id, %user_id, "admin revoked sessions");
    Ok(Json(RevokeResponse {
        ok: true,
        refresh_token_version: version,
    }))
}
