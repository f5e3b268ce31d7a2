//! Credential extraction: the admin secret gate inputs and the token locator.
//!
//! Everything here works on values already pulled off the request, so the
//! request itself is never mutated by an authorization check. Body redaction
//! returns a new body instead.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, header, request::Parts};
use serde_json::Value;

use permgate_auth::{TokenError, TokenIssuer};

/// Query parameter and body field carrying the admin secret.
pub const SECRET_FIELD: &str = "secret";

/// Header carrying the admin secret.
pub const API_SECRET_HEADER: &str = "api-secret";

/// Query parameter carrying an access token identifier.
pub const TOKEN_PARAM: &str = "token";

/// The configured secret must be longer than this for the admin bypass to exist.
pub const MIN_ADMIN_SECRET_LEN: usize = 12;

/// Request inputs the permission check looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    pub query_secret: Option<String>,
    pub header_secret: Option<String>,
    pub body_secret: Option<String>,
    pub bearer: Option<String>,
    pub token_param: Option<String>,
}

impl RequestCredentials {
    /// Collect credentials from request head parts plus an already-extracted body secret.
    pub fn from_parts(parts: &Parts, body_secret: Option<String>) -> Self {
        let query: HashMap<String, String> = Query::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        Self {
            query_secret: non_empty(query.get(SECRET_FIELD).cloned()),
            header_secret: non_empty(header_str(&parts.headers, API_SECRET_HEADER)),
            body_secret: non_empty(body_secret),
            bearer: header_str(&parts.headers, header::AUTHORIZATION.as_str())
                .as_deref()
                .and_then(bearer_token)
                .map(str::to_string),
            token_param: non_empty(query.get(TOKEN_PARAM).cloned()),
        }
    }

    /// Supplied admin secret: query, then header, then body.
    pub fn admin_secret(&self) -> Option<&str> {
        self.query_secret
            .as_deref()
            .or(self.header_secret.as_deref())
            .or(self.body_secret.as_deref())
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse `Bearer <token>`: exactly two space-separated fields, the first literally `Bearer`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut fields = header.split(' ');
    let (Some(scheme), Some(token), None) = (fields.next(), fields.next(), fields.next()) else {
        return None;
    };

    if scheme != "Bearer" || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Remove the `secret` field from a JSON body.
///
/// Arrays are searched in their first element only. Returns the removed value
/// (of any JSON type) and the redacted body.
pub fn take_body_secret(mut body: Value) -> (Option<Value>, Value) {
    let target = match &mut body {
        Value::Array(items) => items.first_mut(),
        other => Some(other),
    };

    let removed = match target {
        Some(Value::Object(map)) => map.remove(SECRET_FIELD),
        _ => None,
    };

    (removed, body)
}

/// Remove every `secret` pair from decoded form fields.
///
/// Returns the first removed value, if any pair was removed, and the remaining pairs in order.
pub fn take_form_secret(pairs: Vec<(String, String)>) -> (Option<String>, Vec<(String, String)>) {
    let mut removed = None;
    let mut kept = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if key == SECRET_FIELD {
            removed.get_or_insert(value);
        } else {
            kept.push((key, value));
        }
    }
    (removed, kept)
}

/// Does the supplied secret unlock the admin bypass?
///
/// Never passes when the configured secret is absent or not longer than
/// [`MIN_ADMIN_SECRET_LEN`] characters.
pub fn admin_secret_passes(configured: Option<&str>, supplied: Option<&str>) -> bool {
    let (Some(configured), Some(supplied)) = (configured, supplied) else {
        return false;
    };

    if configured.chars().count() <= MIN_ADMIN_SECRET_LEN {
        return false;
    }

    constant_time_eq(configured.as_bytes(), supplied.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

/// Find the caller's token: a `Bearer` header first, then a `token` query
/// parameter exchanged for a freshly issued token.
///
/// An unknown access token yields `Ok(None)`. Issuance errors are returned.
pub fn locate_token(
    credentials: &RequestCredentials,
    issuer: &TokenIssuer,
) -> Result<Option<String>, TokenError> {
    if let Some(bearer) = &credentials.bearer {
        return Ok(Some(bearer.clone()));
    }

    let Some(access_token) = &credentials.token_param else {
        return Ok(None);
    };

    Ok(issuer.issue(access_token)?.map(|authorized| authorized.token))
}
