//! Tenant-scoped persistence.
//!
//! Every lookup takes the caller's tenant id as part of its predicate; a row
//! that exists under another tenant is reported exactly like a missing one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::User;
use crate::models::reservation::{AuditEntry, Reservation, ReservationFilter, ReservationPatch};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Maximum rows returned by a reservation list.
pub const RESERVATION_LIST_LIMIT: i64 = 200;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// User lookups and the revocation counter.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Active user by (already lower-cased) email, across tenants.
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Active user by id within `tenant_id`.
    async fn find_active(&self, tenant_id: Uuid, user_id: Uuid)
    -> Result<Option<User>, StoreError>;

    /// Atomically increment `refresh_token_version`, returning the new value.
    async fn bump_refresh_token_version(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<i32>, StoreError>;
}

/// Reservation reads and patches.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Reservations of `tenant_id` matching `filter`, by `start_at` ascending.
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        limit: i64,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Reservation>, StoreError>;

    /// Apply `patch` to the reservation; `None` when it is not in `tenant_id`.
    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: &ReservationPatch,
    ) -> Result<Option<Reservation>, StoreError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
}
