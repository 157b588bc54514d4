//! Reservation domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::FieldErrors;

/// Reservation lifecycle state matching the `reservation_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "reservation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// Contact summary embedded in a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub id: Uuid,
    pub full_name: String,
    pub phone_e164: Option<String>,
}

/// A reservation as seen by backoffice staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub status: ReservationStatus,
    pub experience_type: Option<String>,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub pax: i32,
    pub notes: Option<String>,
    pub assigned_table_ids: Vec<String>,
    pub contact: Option<ContactSummary>,
}

/// Filters accepted by the reservation list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    /// Inclusive lower bound on `start_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `start_at`.
    pub to: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
    /// Case-insensitive contact name substring, or phone substring.
    pub q: Option<String>,
}

impl ReservationFilter {
    /// Whether `reservation` passes every filter that is set.
    pub fn matches(&self, reservation: &Reservation) -> bool {
        if let Some(from) = self.from
            && reservation.start_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && reservation.start_at > to
        {
            return false;
        }
        if let Some(status) = self.status
            && reservation.status != status
        {
            return false;
        }
        match self.q.as_deref().filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => reservation.contact.as_ref().is_some_and(|c| {
                c.full_name.to_lowercase().contains(&q.to_lowercase())
                    || c.phone_e164.as_deref().is_some_and(|p| p.contains(q))
            }),
        }
    }
}

/// Partial update of a reservation.
///
/// `notes` and `experience_type` distinguish "absent" (`None`) from
/// "set to null" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pax: Option<i32>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub experience_type: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_table_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
}

/// Maps a present JSON `null` to `Some(None)`; absence is handled by `default`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

const MIN_DURATION_MINUTES: i32 = 15;
const MAX_DURATION_MINUTES: i32 = 24 * 60;
const MAX_PAX: i32 = 999;
const MAX_NOTES_LEN: usize = 4000;
const MAX_EXPERIENCE_TYPE_LEN: usize = 200;

impl ReservationPatch {
    /// Wire names of the fields present in this patch.
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.start_at.is_some() {
            fields.push("startAt");
        }
        if self.duration_minutes.is_some() {
            fields.push("durationMinutes");
        }
        if self.pax.is_some() {
            fields.push("pax");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        if self.experience_type.is_some() {
            fields.push("experienceType");
        }
        if self.assigned_table_ids.is_some() {
            fields.push("assignedTableIds");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        fields
    }

    /// Range and length checks; returns every violation at once.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut push = |field: &str, msg: String| {
            errors.entry(field.to_string()).or_default().push(msg);
        };

        if let Some(d) = self.duration_minutes
            && !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&d)
        {
            push(
                "durationMinutes",
                format!("must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}"),
            );
        }
        if let Some(p) = self.pax
            && !(1..=MAX_PAX).contains(&p)
        {
            push("pax", format!("must be between 1 and {MAX_PAX}"));
        }
        if let Some(Some(n)) = &self.notes
            && n.chars().count() > MAX_NOTES_LEN
        {
            push("notes", format!("must be at most {MAX_NOTES_LEN} characters"));
        }
        if let Some(Some(e)) = &self.experience_type
            && e.chars().count() > MAX_EXPERIENCE_TYPE_LEN
        {
            push(
                "experienceType",
                format!("must be at most {MAX_EXPERIENCE_TYPE_LEN} characters"),
            );
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Apply the present fields to `reservation` in place.
    pub fn apply_to(&self, reservation: &mut Reservation) {
        if let Some(start_at) = self.start_at {
            reservation.start_at = start_at;
        }
        if let Some(d) = self.duration_minutes {
            reservation.duration_minutes = d;
        }
        if let Some(p) = self.pax {
            reservation.pax = p;
        }
        if let Some(notes) = &self.notes {
            reservation.notes.clone_from(notes);
        }
        if let Some(e) = &self.experience_type {
            reservation.experience_type.clone_from(e);
        }
        if let Some(ids) = &self.assigned_table_ids {
            reservation.assigned_table_ids.clone_from(ids);
        }
        if let Some(status) = self.status {
            reservation.status = status;
        }
    }
}

/// Audit log entry written after a state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub actor_user_id: Option<Uuid>,
    /// Dotted action name, e.g. `reservation.updated`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            status: ReservationStatus::Pending,
            experience_type: Some("dinner".into()),
            start_at: "2026-06-01T19:00:00Z".parse().unwrap(),
            duration_minutes: 90,
            pax: 2,
            notes: Some("window seat".into()),
            assigned_table_ids: vec![],
            contact: Some(ContactSummary {
                id: Uuid::new_v4(),
                full_name: "Maria Rossi".into(),
                phone_e164: Some("+393331234567".into()),
            }),
        }
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: ReservationPatch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.experience_type, None);
        assert_eq!(patch.present_fields(), vec!["notes"]);
    }

    #[test]
    fn patch_lists_present_fields_in_wire_names() {
        let patch: ReservationPatch = serde_json::from_str(
            r#"{"pax": 4, "status": "CONFIRMED", "assignedTableIds": ["t1"]}"#,
        )
        .unwrap();
        assert_eq!(
            patch.present_fields(),
            vec!["pax", "assignedTableIds", "status"]
        );
    }

    #[test]
    fn validate_collects_every_violation() {
        let patch = ReservationPatch {
            duration_minutes: Some(5),
            pax: Some(0),
            notes: Some(Some("x".repeat(4001))),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert!(errors.contains_key("durationMinutes"));
        assert!(errors.contains_key("pax"));
        assert!(errors.contains_key("notes"));
        assert!(!errors.contains_key("experienceType"));
    }

    #[test]
    fn validate_accepts_bounds() {
        let patch = ReservationPatch {
            duration_minutes: Some(1440),
            pax: Some(999),
            notes: Some(None),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn apply_to_only_touches_present_fields() {
        let mut r = sample();
        let before = r.clone();
        let patch = ReservationPatch {
            pax: Some(6),
            notes: Some(None),
            ..Default::default()
        };
        patch.apply_to(&mut r);
        assert_eq!(r.pax, 6);
        assert_eq!(r.notes, None);
        assert_eq!(r.experience_type, before.experience_type);
        assert_eq!(r.start_at, before.start_at);
    }

    #[test]
    fn filter_matches_contact_name_case_insensitively() {
        let r = sample();
        let filter = ReservationFilter {
            q: Some("rossi".into()),
            ..Default::default()
        };
        assert!(filter.matches(&r));

        let filter = ReservationFilter {
            q: Some("333123".into()),
            ..Default::default()
        };
        assert!(filter.matches(&r));

        let filter = ReservationFilter {
            q: Some("bianchi".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let r = sample();
        let filter = ReservationFilter {
            from: Some(r.start_at),
            to: Some(r.start_at),
            status: Some(ReservationStatus::Pending),
            q: None,
        };
        assert!(filter.matches(&r));

        let filter = ReservationFilter {
            status: Some(ReservationStatus::Cancelled),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }
}
