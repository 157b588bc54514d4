//! Business logic services.

pub mod calendar;
pub mod cookies;
pub mod reservations;
