//! HTTP route modules.

pub mod audits;
pub mod health;
pub mod sessions;
