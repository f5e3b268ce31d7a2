use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::authz::Authorization;
use crate::middleware::require_permission;

pub mod authorization;
pub mod system;

pub fn router(authz: &Arc<Authorization>) -> Router {
    Router::new()
        .route(
            "/api/v1/authorization/request/:access_token",
            get(authorization::request_token),
        )
        .route(
            "/api/v1/status",
            get(system::status).route_layer(from_fn_with_state(
                authz.require_permission("api:status:read"),
                require_permission,
            )),
        )
        .route(
            "/api/v1/entries",
            post(system::create_entries).route_layer(from_fn_with_state(
                authz.require_permission("api:entries:create"),
                require_permission,
            )),
        )
}
