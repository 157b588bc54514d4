//! Reservation request handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use backoffice_core::models::auth::Identity;
use backoffice_core::models::reservation::{Reservation, ReservationFilter, ReservationPatch};

use crate::AppState;
use crate::error::AppResult;
use crate::models::DataResponse;
use crate::services::reservations;

/// `GET /reservations`: tenant-scoped list, ordered by start time.
pub async fn list_reservations_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<ReservationFilter>, QueryRejection>,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let Query(filter) = query?;
    let data = reservations::list(state.reservations.as_ref(), &identity, &filter).await?;
    Ok(Json(DataResponse { data }))
}

/// `PATCH /reservations/{id}`: partial update, then a best-effort calendar sync.
pub async fn patch_reservation_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<ReservationPatch>, JsonRejection>,
) -> AppResult<Json<DataResponse<Reservation>>> {
    let Json(patch) = payload?;
    let data = reservations::patch(
        state.reservations.as_ref(),
        state.audit.as_ref(),
        &identity,
        &id,
        &patch,
    )
    .await?;
    state.calendar.spawn_sync(data.id);
    Ok(Json(DataResponse { data }))
}
