//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuditStore, ReservationStore, StoreError, UserStore};
use crate::models::auth::User;
use crate::models::reservation::{
    AuditEntry, ContactSummary, Reservation, ReservationFilter, ReservationPatch,
    ReservationStatus,
};

const USER_COLUMNS: &str = "id, tenant_id, name, email, phone_e164, password_hash, role, \
                            is_active, refresh_token_version";

/// Reservation columns plus the joined contact, shared by every read.
const RESERVATION_SELECT: &str = r#"
    SELECT r.id, r.tenant_id, r.status, r.experience_type, r.start_at,
           r.duration_minutes, r.pax, r.notes, r.assigned_table_ids,
           c.id AS contact_id, c.full_name AS contact_full_name,
           c.phone_e164 AS contact_phone_e164
    FROM reservations r
    LEFT JOIN contacts c ON c.id = r.contact_id AND c.tenant_id = r.tenant_id
"#;

/// `%q%` for `LIKE ... ESCAPE '\'`, with `q` matched literally.
fn contains_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Row returned by reservation queries.
#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    tenant_id: Uuid,
    status: ReservationStatus,
    experience_type: Option<String>,
    start_at: DateTime<Utc>,
    duration_minutes: i32,
    pax: i32,
    notes: Option<String>,
    assigned_table_ids: Vec<String>,
    contact_id: Option<Uuid>,
    contact_full_name: Option<String>,
    contact_phone_e164: Option<String>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        let contact = match (row.contact_id, row.contact_full_name) {
            (Some(id), Some(full_name)) => Some(ContactSummary {
                id,
                full_name,
                phone_e164: row.contact_phone_e164,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            status: row.status,
            experience_type: row.experience_type,
            start_at: row.start_at,
            duration_minutes: row.duration_minutes,
            pax: row.pax,
            notes: row.notes,
            assigned_table_ids: row.assigned_table_ids,
            contact,
        }
    }
}

/// Store over a `sqlx` PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_active(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = $1 AND tenant_id = $2 AND is_active"
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn bump_refresh_token_version(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<i32>, StoreError> {
        let version = sqlx::query_scalar::<_, i32>(
            "UPDATE users SET refresh_token_version = refresh_token_version + 1 \
             WHERE id = $1 AND tenant_id = $2 \
             RETURNING refresh_token_version",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(version)
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn list(
        &self,
        tenant_id: Uuid,
        filter: &ReservationFilter,
        limit: i64,
    ) -> Result<Vec<Reservation>, StoreError> {
        let q = filter
            .q
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(contains_pattern);
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"{RESERVATION_SELECT}
            WHERE r.tenant_id = $1
              AND ($2::timestamptz IS NULL OR r.start_at >= $2)
              AND ($3::timestamptz IS NULL OR r.start_at <= $3)
              AND ($4::reservation_status IS NULL OR r.status = $4)
              AND ($5::text IS NULL
                   OR c.full_name ILIKE $5 ESCAPE '\'
                   OR c.phone_e164 LIKE $5 ESCAPE '\')
            ORDER BY r.start_at ASC
            LIMIT $6
            "#
        ))
        .bind(tenant_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status)
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Reservation>, StoreError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{RESERVATION_SELECT} WHERE r.id = $1 AND r.tenant_id = $2"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Reservation::from))
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: &ReservationPatch,
    ) -> Result<Option<Reservation>, StoreError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            WITH r AS (
                UPDATE reservations SET
                    start_at = COALESCE($3::timestamptz, start_at),
                    duration_minutes = COALESCE($4::int4, duration_minutes),
                    pax = COALESCE($5::int4, pax),
                    notes = CASE WHEN $6::bool THEN $7::text ELSE notes END,
                    experience_type = CASE WHEN $8::bool THEN $9::text ELSE experience_type END,
                    assigned_table_ids = COALESCE($10::text[], assigned_table_ids),
                    status = COALESCE($11::reservation_status, status),
                    updated_at = now()
                WHERE id = $1 AND tenant_id = $2
                RETURNING *
            )
            SELECT r.id, r.tenant_id, r.status, r.experience_type, r.start_at,
                   r.duration_minutes, r.pax, r.notes, r.assigned_table_ids,
                   c.id AS contact_id, c.full_name AS contact_full_name,
                   c.phone_e164 AS contact_phone_e164
            FROM r
            LEFT JOIN contacts c ON c.id = r.contact_id AND c.tenant_id = r.tenant_id
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(patch.start_at)
        .bind(patch.duration_minutes)
        .bind(patch.pax)
        .bind(patch.notes.is_some())
        .bind(patch.notes.clone().flatten())
        .bind(patch.experience_type.is_some())
        .bind(patch.experience_type.clone().flatten())
        .bind(patch.assigned_table_ids.clone())
        .bind(patch.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Reservation::from))
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_logs \
             (id, tenant_id, actor_user_id, action, entity_type, entity_id, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(entry.tenant_id)
        .bind(entry.actor_user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
