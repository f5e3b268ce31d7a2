//! Per-route permission check.
//!
//! A route declares its permission once, at registration time, through
//! [`Authorization::require_permission`]. The returned [`PermissionGuard`] runs
//! the decision procedure for every request:
//!
//! 1. admin secret gate: allow on match,
//! 2. locate a token,
//! 3. build the default-role trie,
//! 4. no token: allow iff the default roles cover the permission,
//! 5. token: verify it (the only await point), then allow iff the subject's
//!    roles or the default roles cover the permission.
//!
//! Exactly one [`Decision`] comes out. Nothing past a denial is evaluated.

use std::sync::Arc;

use permgate_auth::{
    AuthorizationStorage, Hs256TokenVerifier, Permission, PermissionRegistry, PermissionTrie, Role,
    TokenIssuer, TokenVerifier,
};

use crate::config::AuthConfig;
use crate::context::{AuthorizationContext, Grant};
use crate::credentials::{RequestCredentials, admin_secret_passes, locate_token};

/// Why a request was denied. Logged, never shown to the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No token, and the default roles do not cover the permission.
    NoCredential,
    /// A token was presented but failed signature or expiry checks.
    InvalidToken,
    /// An access token could not be exchanged for a token.
    IssuanceFailed,
    /// The token is valid but neither the subject nor the defaults cover the permission.
    InsufficientPermission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AuthorizationContext),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// The authorization subsystem: one instance per application.
pub struct Authorization {
    storage: Arc<dyn AuthorizationStorage>,
    issuer: TokenIssuer,
    verifier: Arc<dyn TokenVerifier>,
    api_secret: Option<String>,
    default_roles: Vec<Role>,
    registry: PermissionRegistry,
}

impl Authorization {
    pub fn new(config: &AuthConfig, storage: Arc<dyn AuthorizationStorage>) -> Self {
        let issuer = TokenIssuer::new(storage.clone(), config.api_secret.clone())
            .with_ttl(config.token_ttl);
        let verifier = Arc::new(Hs256TokenVerifier::new(config.api_secret.clone()));

        Self {
            storage,
            issuer,
            verifier,
            api_secret: config.api_secret.clone(),
            default_roles: config.default_roles.clone(),
            registry: PermissionRegistry::new(),
        }
    }

    /// Replace the token verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    /// Declare `permission` and return a guard bound to it.
    ///
    /// Call while building the router, before serving requests.
    pub fn require_permission(self: &Arc<Self>, permission: impl Into<Permission>) -> PermissionGuard {
        let permission = permission.into();
        self.registry.declare(permission.clone());
        PermissionGuard {
            authorization: Arc::clone(self),
            permission,
        }
    }

    /// Trie over the permissions of the default roles.
    pub fn default_permissions(&self) -> PermissionTrie {
        PermissionTrie::build(self.storage.roles_to_permissions(&self.default_roles))
    }

    /// Run the decision procedure for one request.
    pub async fn check(&self, permission: &Permission, credentials: &RequestCredentials) -> Decision {
        if admin_secret_passes(self.api_secret.as_deref(), credentials.admin_secret()) {
            return Decision::Allow(AuthorizationContext::new(Grant::AdminSecret, None));
        }

        let token = match locate_token(credentials, &self.issuer) {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(error = %err, "failed to issue token for access token parameter");
                return Decision::Deny(DenyReason::IssuanceFailed);
            }
        };

        let builtin = self.default_permissions();

        let Some(token) = token else {
            return if builtin.check(permission.as_str()) {
                Decision::Allow(AuthorizationContext::new(Grant::Default, None))
            } else {
                Decision::Deny(DenyReason::NoCredential)
            };
        };

        let claims = match self.verifier.verify(&token).await {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(error = %err, "error verifying authorized token");
                return Decision::Deny(DenyReason::InvalidToken);
            }
        };
        tracing::debug!(iat = claims.iat, exp = claims.exp, "verified authorization");

        let subject = self.storage.find_subject_permissions(&claims.access_token);
        let access_token = Some(claims.access_token);

        if subject.check(permission.as_str()) {
            Decision::Allow(AuthorizationContext::new(Grant::Subject, access_token))
        } else if builtin.check(permission.as_str()) {
            Decision::Allow(AuthorizationContext::new(Grant::Default, access_token))
        } else {
            Decision::Deny(DenyReason::InsufficientPermission)
        }
    }
}

/// A decision procedure bound to one permission. Cheap to clone.
#[derive(Clone)]
pub struct PermissionGuard {
    authorization: Arc<Authorization>,
    permission: Permission,
}

impl PermissionGuard {
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub async fn check(&self, credentials: &RequestCredentials) -> Decision {
        self.authorization.check(&self.permission, credentials).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use permgate_auth::{
        AuthorizedClaims, ClaimsValidationError, InMemoryAuthorizationStore, TokenError,
    };

    use super::*;

    const SECRET: &str = "this-is-a-long-secret";

    struct Fixture {
        store: Arc<InMemoryAuthorizationStore>,
        authz: Arc<Authorization>,
    }

    fn fixture(secret: Option<&str>, default_roles: &[&'static str]) -> Fixture {
        let store = Arc::new(InMemoryAuthorizationStore::new());
        store.upsert_role(Role::new("users-admin"), vec!["users:*".to_string()]);
        let config = AuthConfig {
            api_secret: secret.map(str::to_string),
            default_roles: default_roles.iter().map(|r| Role::new(*r)).collect(),
            ..AuthConfig::default()
        };
        let authz = Arc::new(Authorization::new(&config, store.clone()));
        Fixture { store, authz }
    }

    fn bearer(token: &str) -> RequestCredentials {
        RequestCredentials {
            bearer: Some(token.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn require_permission_declares_once() {
        let f = fixture(Some(SECRET), &[]);
        let guard = f.authz.require_permission("users:read");
        let _again = f.authz.require_permission("users:read");

        assert_eq!(guard.permission().as_str(), "users:read");
        assert_eq!(f.authz.registry().len(), 1);
        assert!(f.authz.registry().expand().check("users:read"));
    }

    #[tokio::test]
    async fn admin_secret_short_circuits() {
        let f = fixture(Some(SECRET), &[]);
        let guard = f.authz.require_permission("anything:at:all");
        let creds = RequestCredentials {
            header_secret: Some(SECRET.to_string()),
            bearer: Some("garbage".to_string()),
            ..Default::default()
        };

        assert_eq!(
            guard.check(&creds).await,
            Decision::Allow(AuthorizationContext::new(Grant::AdminSecret, None))
        );
    }

    #[tokio::test]
    async fn short_secret_disables_admin_gate() {
        let f = fixture(Some("eightchr"), &[]);
        let guard = f.authz.require_permission("api:status:read");
        let creds = RequestCredentials {
            body_secret: Some("eightchr".to_string()),
            ..Default::default()
        };

        assert_eq!(guard.check(&creds).await, Decision::Deny(DenyReason::NoCredential));
    }

    #[tokio::test]
    async fn default_roles_grant_without_token() {
        let f = fixture(Some(SECRET), &["status-only"]);
        let status = f.authz.require_permission("api:status:read");
        let entries = f.authz.require_permission("api:entries:read");

        let none = RequestCredentials::default();
        assert_eq!(
            status.check(&none).await,
            Decision::Allow(AuthorizationContext::new(Grant::Default, None))
        );
        assert_eq!(entries.check(&none).await, Decision::Deny(DenyReason::NoCredential));
    }

    #[tokio::test]
    async fn valid_token_grants_by_subject_roles() {
        let f = fixture(Some(SECRET), &[]);
        let subject = f
            .store
            .create_subject("ops", vec![Role::new("users-admin")]);
        let issued = f.authz.issuer().issue(&subject.access_token).unwrap().unwrap();

        let read = f.authz.require_permission("users:read");
        let groups = f.authz.require_permission("groups:read");

        assert_eq!(
            read.check(&bearer(&issued.token)).await,
            Decision::Allow(AuthorizationContext::new(
                Grant::Subject,
                Some(subject.access_token.clone())
            ))
        );
        assert_eq!(
            groups.check(&bearer(&issued.token)).await,
            Decision::Deny(DenyReason::InsufficientPermission)
        );
    }

    #[tokio::test]
    async fn valid_token_still_gets_default_floor() {
        let f = fixture(Some(SECRET), &["status-only"]);
        let subject = f.store.create_subject("nobody", vec![Role::new("denied")]);
        let issued = f.authz.issuer().issue(&subject.access_token).unwrap().unwrap();

        let status = f.authz.require_permission("api:status:read");
        assert_eq!(
            status.check(&bearer(&issued.token)).await,
            Decision::Allow(AuthorizationContext::new(
                Grant::Default,
                Some(subject.access_token)
            ))
        );
    }

    #[tokio::test]
    async fn expired_token_is_denied_even_with_default_floor() {
        let f = fixture(Some(SECRET), &["status-only"]);
        let subject = f.store.create_subject("ops", vec![Role::new("admin")]);
        let issued = f
            .authz
            .issuer()
            .issue_at(&subject.access_token, Utc::now() - Duration::hours(2))
            .unwrap()
            .unwrap();

        let status = f.authz.require_permission("api:status:read");
        assert_eq!(
            status.check(&bearer(&issued.token)).await,
            Decision::Deny(DenyReason::InvalidToken)
        );
    }

    #[tokio::test]
    async fn token_parameter_is_exchanged() {
        let f = fixture(Some(SECRET), &[]);
        let subject = f.store.create_subject("reader", vec![Role::new("readable")]);
        let guard = f.authz.require_permission("api:entries:read");

        let creds = RequestCredentials {
            token_param: Some(subject.access_token.clone()),
            ..Default::default()
        };
        assert!(guard.check(&creds).await.is_allowed());

        let unknown = RequestCredentials {
            token_param: Some("nobody-0000000000000000".to_string()),
            ..Default::default()
        };
        assert_eq!(guard.check(&unknown).await, Decision::Deny(DenyReason::NoCredential));
    }

    #[tokio::test]
    async fn issuance_failure_denies() {
        let f = fixture(None, &["readable"]);
        let subject = f.store.create_subject("reader", vec![Role::new("readable")]);
        let guard = f.authz.require_permission("api:entries:read");

        let creds = RequestCredentials {
            token_param: Some(subject.access_token),
            ..Default::default()
        };
        assert_eq!(guard.check(&creds).await, Decision::Deny(DenyReason::IssuanceFailed));
    }

    struct RejectAll;

    #[async_trait]
    impl TokenVerifier for RejectAll {
        async fn verify(&self, _token: &str) -> Result<AuthorizedClaims, TokenError> {
            Err(TokenError::Claims(ClaimsValidationError::Expired))
        }
    }

    #[tokio::test]
    async fn verifier_is_pluggable() {
        let store = Arc::new(InMemoryAuthorizationStore::new());
        let config = AuthConfig {
            api_secret: Some(SECRET.to_string()),
            ..AuthConfig::default()
        };
        let authz = Arc::new(Authorization::new(&config, store).with_verifier(Arc::new(RejectAll)));
        let guard = authz.require_permission("api:status:read");

        assert_eq!(
            guard.check(&bearer("anything")).await,
            Decision::Deny(DenyReason::InvalidToken)
        );
    }
}
