//! HTTP handlers for idp-auth-service.

pub mod auth;
pub mod metrics;
