use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How far `iat` may run ahead of the verifying clock, in seconds.
///
/// Tokens minted on a host with a slightly fast clock stay usable elsewhere.
pub const IAT_LEEWAY_SECS: i64 = 60;

/// Claims carried by an authorized token.
///
/// Exactly one application claim, `accessToken`, plus the standard issued-at
/// and expiry fields in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedClaims {
    /// Access token identifier of the subject the token was issued for.
    #[serde(rename = "accessToken")]
    pub access_token: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl AuthorizedClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens before this, in the token verifier.
pub fn validate_claims(
    claims: &AuthorizedClaims,
    now: DateTime<Utc>,
) -> Result<(), ClaimsValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(ClaimsValidationError::InvalidTimeWindow);
    }
    if now.saturating_add(IAT_LEEWAY_SECS) < claims.iat {
        return Err(ClaimsValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(ClaimsValidationError::Expired);
    }
    Ok(())
}
