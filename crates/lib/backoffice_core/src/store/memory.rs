//! In-process store backed by `DashMap`.
//!
//! Same tenant-scoping contract as the PostgreSQL store. Used by the test
//! suites and for running the API without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{AuditStore, ReservationStore, StoreError, UserStore};
use crate::models::auth::User;
use crate::models::reservation::{AuditEntry, Reservation, ReservationFilter, ReservationPatch};

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    reservations: DashMap<Uuid, Reservation>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user. The email is lower-cased on the way in.
    pub fn insert_user(&self, mut user: User) {
        user.email = user.email.to_lowercase();
        self.users.insert(user.id, user);
    }

    pub fn insert_reservation(&self, reservation: Reservation) {
        self.reservations.insert(reservation.id, reservation);
    }

    /// Snapshot of a user regardless of tenant or activity.
    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|u| u.value().clone())
    }

    /// Snapshot of a reservation regardless of tenant.
    pub fn reservation(&self, id: Uuid) -> Option<Reservation> {
        self.reservations.get(&id).map(|r| r.value().clone())
    }

    /// Flip a user's `is_active` flag. Returns false when the user is unknown.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Audit entries recorded so far, oldest first.
    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>, StoreError> {
        self.audit
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| StoreError::Unavailable("audit log lock poisoned".into()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.is_active && u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn find_active(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .get(&user_id)
            .filter(|u| u.tenant_id == tenant_id && u.is_active)
            .map(|u| u.value().clone()))
    }

    async fn bump_refresh_token_version(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<i32>, StoreError> {
        // The shard write lock makes read-increment-return atomic.
        match self.users.get_mut(&user_id) {
            Some(mut user) if user.tenant_id == tenant_id => {
                user.refresh_token_version += 1;
                Ok(Some(user.refresh_token_version))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        limit: i64,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut rows: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.start_at);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .reservations
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.value().clone()))
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: &ReservationPatch,
    ) -> Result<Option<Reservation>, StoreError> {
        match self.reservations.get_mut(&id) {
            Some(mut r) if r.tenant_id == tenant_id => {
                patch.apply_to(&mut r);
                Ok(Some(r.value().clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit
            .lock()
            .map_err(|_| StoreError::Unavailable("audit log lock poisoned".into()))?
            .push(entry);
        Ok(())
    }
}
