use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::app::errors;
use crate::authz::{Decision, PermissionGuard};
use crate::credentials::{RequestCredentials, take_body_secret, take_form_secret};

/// Largest JSON or form body buffered for secret redaction.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Enforce the guard's permission; use with `axum::middleware::from_fn_with_state`.
///
/// JSON and form bodies are redacted of their `secret` field before anything else runs,
/// whatever the outcome. Denials get the same generic 401 regardless of cause.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let (body_secret, body) = match redact_body(&mut parts.headers, body).await {
        Ok(redacted) => redacted,
        Err(response) => return response,
    };

    let credentials = RequestCredentials::from_parts(&parts, body_secret);

    match guard.check(&credentials).await {
        Decision::Allow(context) => {
            parts.extensions.insert(context);
            next.run(Request::from_parts(parts, body)).await
        }
        Decision::Deny(reason) => {
            tracing::debug!(
                permission = %guard.permission(),
                ?reason,
                method = %parts.method,
                path = %parts.uri.path(),
                "request denied"
            );
            errors::unauthorized()
        }
    }
}

/// Body encodings that can carry a `secret` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

/// Buffer a JSON or form body, strip its `secret` field and hand back a replacement body.
async fn redact_body(
    headers: &mut HeaderMap,
    body: Body,
) -> Result<(Option<String>, Body), Response> {
    let Some(kind) = body_kind(headers) else {
        return Ok((None, body));
    };

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(body_read_error)?;

    let redacted = match kind {
        BodyKind::Json => redact_json(&bytes)?,
        BodyKind::Form => redact_form(&bytes)?,
    };

    let Some((secret, redacted)) = redacted else {
        return Ok((None, Body::from(bytes)));
    };
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(redacted.len()));

    Ok((secret, Body::from(redacted)))
}

/// `None` when there was nothing to remove; unparseable bodies pass through
/// and the handler's extractor rejects them.
fn redact_json(bytes: &[u8]) -> Result<Option<(Option<String>, Bytes)>, Response> {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return Ok(None);
    };

    let (removed, redacted) = take_body_secret(value);
    let Some(removed) = removed else {
        return Ok(None);
    };

    let secret = match removed {
        Value::String(s) => Some(s),
        _ => None,
    };
    let bytes = serde_json::to_vec(&redacted).map_err(|_| invalid_body())?;

    Ok(Some((secret, Bytes::from(bytes))))
}

fn redact_form(bytes: &[u8]) -> Result<Option<(Option<String>, Bytes)>, Response> {
    let Ok(pairs) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) else {
        return Ok(None);
    };

    let (removed, kept) = take_form_secret(pairs);
    if removed.is_none() {
        return Ok(None);
    }
    let encoded = serde_urlencoded::to_string(&kept).map_err(|_| invalid_body())?;

    Ok(Some((removed, Bytes::from(encoded))))
}

/// Only an exceeded size limit is a 413; any other read failure is the client's broken body.
fn body_read_error(err: axum::Error) -> Response {
    let err = err.into_inner();
    if exceeded_limit(&*err) {
        return errors::json_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "request body too large",
        );
    }
    tracing::debug!(error = %err, "failed to read request body");
    invalid_body()
}

fn exceeded_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

fn invalid_body() -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", "invalid request body")
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let mime = headers
        .get(header::CONTENT_TYPE)?
        .to_str()
        .ok()?
        .split(';')
        .next()?
        .trim();

    if mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json") {
        Some(BodyKind::Json)
    } else if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Some(BodyKind::Form)
    } else {
        None
    }
}
