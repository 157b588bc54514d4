//! Request middleware.

pub mod gate;
pub mod rate_limit;
