use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

use crate::context::AuthorizationContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn status(Extension(context): Extension<AuthorizationContext>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "grant": context.grant(),
        "authenticated": context.access_token().is_some(),
    }))
}

/// Accepts a JSON payload and echoes what the handler received.
///
/// The body reaching this handler has already had any `secret` field removed.
pub async fn create_entries(
    Extension(context): Extension<AuthorizationContext>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "grant": context.grant(),
            "received": body,
        })),
    )
}
