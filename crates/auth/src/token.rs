//! Signed token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying [`AuthorizedClaims`]. They are stateless:
//! validity is decided by signature and time window alone, never by lookup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AuthorizationStorage, AuthorizedClaims, ClaimsValidationError, validate_claims};

/// Lifetime of an issued token, in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("token lifetime out of range")]
    TtlOutOfRange,

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] ClaimsValidationError),
}

/// Outcome of a successful issuance, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub token: String,

    #[serde(rename = "sub")]
    pub subject_name: String,

    pub permissions: Vec<String>,

    #[serde(rename = "iat")]
    pub issued_at: i64,

    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Mints signed tokens for subjects known to storage.
#[derive(Clone)]
pub struct TokenIssuer {
    storage: Arc<dyn AuthorizationStorage>,
    secret: Option<Arc<str>>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(storage: Arc<dyn AuthorizationStorage>, secret: Option<String>) -> Self {
        Self {
            storage,
            secret: secret.map(Arc::from),
            ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, access_token: &str) -> Result<Option<AuthorizationResult>, TokenError> {
        self.issue_at(access_token, Utc::now())
    }

    /// Issue a token as of `now`.
    ///
    /// An unknown access token is `Ok(None)`, not an error. A missing secret or
    /// a signing failure is an error.
    pub fn issue_at(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationResult>, TokenError> {
        let Some(subject) = self.storage.find_subject(access_token) else {
            tracing::debug!("no subject for access token");
            return Ok(None);
        };

        let secret = self.secret.as_deref().ok_or(TokenError::MissingSecret)?;

        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::TtlOutOfRange)?;

        let claims = AuthorizedClaims {
            access_token: subject.access_token.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        // Report the timestamps the token actually carries.
        let decoded = decode_claims(&token, secret)?;

        Ok(Some(AuthorizationResult {
            token,
            subject_name: subject.name,
            permissions: self.storage.roles_to_permissions(&subject.roles),
            issued_at: decoded.iat,
            expires_at: decoded.exp,
        }))
    }
}

/// Verifies a presented token and yields its claims.
///
/// This is the single suspension point of the permission check.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthorizedClaims, TokenError>;
}

/// Shared-secret HS256 verifier.
#[derive(Clone)]
pub struct Hs256TokenVerifier {
    secret: Option<Arc<str>>,
}

impl Hs256TokenVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(Arc::from),
        }
    }

    /// Verify signature, then the time window as of `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AuthorizedClaims, TokenError> {
        let secret = self.secret.as_deref().ok_or(TokenError::MissingSecret)?;
        let claims = decode_claims(token, secret)?;
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

#[async_trait]
impl TokenVerifier for Hs256TokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthorizedClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }
}

/// Signature-checked decode; the time window is left to [`validate_claims`].
fn decode_claims(token: &str, secret: &str) -> Result<AuthorizedClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;

    let data = jsonwebtoken::decode::<AuthorizedClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
