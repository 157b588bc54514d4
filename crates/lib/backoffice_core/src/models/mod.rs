//! Domain models.

pub mod auth;
pub mod reservation;

use std::collections::BTreeMap;

/// Field-level validation messages keyed by the offending (camelCase) field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;
