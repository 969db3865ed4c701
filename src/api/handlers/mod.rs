//! API handlers for parkgate.

pub mod auth;
pub mod health;
