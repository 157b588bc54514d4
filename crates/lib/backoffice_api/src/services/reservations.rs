//! Reservation service: tenant-scoped list and patch with field-level
//! authorization and audit.

use backoffice_core::models::auth::{Identity, Role};
use backoffice_core::models::reservation::{
    AuditEntry, Reservation, ReservationFilter, ReservationPatch,
};
use backoffice_core::store::{AuditStore, RESERVATION_LIST_LIMIT, ReservationStore};
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Fields a STAFF user may change.
pub const STAFF_PATCHABLE: [&str; 2] = ["notes", "pax"];

/// Reject the whole patch if `role` may not touch one of its fields.
///
/// Returns the first offending field in wire order.
pub fn authorize_patch_fields(role: Role, patch: &ReservationPatch) -> AppResult<()> {
    if role != Role::Staff {
        return Ok(());
    }
    match patch
        .present_fields()
        .into_iter()
        .find(|f| !STAFF_PATCHABLE.contains(f))
    {
        Some(field) => Err(AppError::ForbiddenField(field.to_string())),
        None => Ok(()),
    }
}

pub async fn list(
    store: &dyn ReservationStore,
    identity: &Identity,
    filter: &ReservationFilter,
) -> AppResult<Vec<Reservation>> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(AppError::invalid("from", "must not be after `to`"));
    }
    let rows = store
        .list(identity.tenant_id, filter, RESERVATION_LIST_LIMIT)
        .await?;
    debug!(tenant_id = %identity.tenant_id, count = rows.len(), "reservations listed");
    Ok(rows)
}

/// Validate, authorize, apply and audit a patch.
///
/// Nothing is read from the store until validation and field authorization
/// have passed. A malformed id is reported as `NotFound`. Once the update
/// has been stored the patch succeeds; a failed audit write is logged.
pub async fn patch(
    reservations: &dyn ReservationStore,
    audit: &dyn AuditStore,
    identity: &Identity,
    id: &str,
    patch: &ReservationPatch,
) -> AppResult<Reservation> {
    patch.validate().map_err(AppError::Validation)?;
    authorize_patch_fields(identity.role, patch)?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::NotFound)?;

    reservations
        .find(identity.tenant_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let updated = reservations
        .update(identity.tenant_id, id, patch)
        .await?
        .ok_or(AppError::NotFound)?;

    let entry = AuditEntry {
        tenant_id: identity.tenant_id,
        actor_user_id: Some(identity.user_id),
        action: "reservation.updated".into(),
        entity_type: "reservation".into(),
        entity_id: id.to_string(),
        metadata: json!({ "changes": patch }),
    };
    if let Err(e) = audit.record(entry).await {
        error!(
            reservation_id = %id,
            actor = %identity.user_id,
            error = %e,
            "audit write failed after reservation update"
        );
    }

    debug!(reservation_id = %id, fields = ?patch.present_fields(), "reservation updated");
    Ok(updated)
}
