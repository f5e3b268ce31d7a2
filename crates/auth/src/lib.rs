//! `permgate-auth` — transport-agnostic authorization core.
//!
//! Permission matching, the declared-permission registry, subjects and roles,
//! and signed-token issuance/verification. Nothing here knows about HTTP.

pub mod claims;
pub mod permissions;
pub mod registry;
pub mod roles;
pub mod storage;
pub mod subject;
pub mod token;
pub mod trie;

pub use claims::{AuthorizedClaims, ClaimsValidationError, IAT_LEEWAY_SECS, validate_claims};
pub use permissions::Permission;
pub use registry::PermissionRegistry;
pub use roles::{Role, parse_role_list};
pub use storage::{AuthorizationStorage, InMemoryAuthorizationStore, builtin_roles};
pub use subject::Subject;
pub use token::{
    AuthorizationResult, DEFAULT_TOKEN_TTL_SECS, Hs256TokenVerifier, TokenError, TokenIssuer,
    TokenVerifier,
};
pub use trie::PermissionTrie;
