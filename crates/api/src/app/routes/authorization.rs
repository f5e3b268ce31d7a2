use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::errors;
use crate::authz::Authorization;

/// GET /api/v1/authorization/request/:access_token - exchange an access token for a signed token
pub async fn request_token(
    Extension(authz): Extension<Arc<Authorization>>,
    Path(access_token): Path<String>,
) -> Response {
    match authz.issuer().issue(&access_token) {
        Ok(Some(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(None) => errors::unauthorized(),
        Err(err) => {
            tracing::error!(error = %err, "token issuance failed");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "misconfigured",
                "token issuance is not available",
            )
        }
    }
}
