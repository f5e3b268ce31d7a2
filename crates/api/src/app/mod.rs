//! HTTP application wiring (Axum router).
//!
//! - `routes/`: HTTP routes + handlers, each protected route declaring its permission
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use crate::authz::Authorization;

pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Route permissions are declared here, so the permission registry is complete
/// before the router serves its first request.
pub fn build_app(authorization: Arc<Authorization>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router(&authorization))
        .layer(Extension(authorization))
}
