//! HTTP boundary: configuration, the per-route permission check, and routing.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod credentials;
pub mod middleware;
