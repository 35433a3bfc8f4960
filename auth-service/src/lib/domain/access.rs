//! Per-request identity resolution and role-based access decisions.

pub mod authorization;
pub mod errors;
pub mod gate;
pub mod models;
