//! Storage collaborator boundary.
//!
//! The authorization core only reads roles and subjects; how they are
//! persisted is up to the implementation. [`InMemoryAuthorizationStore`] backs
//! tests and the demo server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{PermissionTrie, Role, Subject};

/// Role and subject lookups consumed by the authorization core.
pub trait AuthorizationStorage: Send + Sync {
    /// Flatten the permissions of the named roles, in order, without duplicates.
    fn roles_to_permissions(&self, roles: &[Role]) -> Vec<String>;

    fn find_subject(&self, access_token: &str) -> Option<Subject>;

    /// Trie over the permissions of the subject's roles; empty for unknown subjects.
    fn find_subject_permissions(&self, access_token: &str) -> PermissionTrie {
        match self.find_subject(access_token) {
            Some(subject) => PermissionTrie::build(self.roles_to_permissions(&subject.roles)),
            None => PermissionTrie::empty(),
        }
    }
}

impl<S> AuthorizationStorage for Arc<S>
where
    S: AuthorizationStorage + ?Sized,
{
    fn roles_to_permissions(&self, roles: &[Role]) -> Vec<String> {
        (**self).roles_to_permissions(roles)
    }

    fn find_subject(&self, access_token: &str) -> Option<Subject> {
        (**self).find_subject(access_token)
    }

    fn find_subject_permissions(&self, access_token: &str) -> PermissionTrie {
        (**self).find_subject_permissions(access_token)
    }
}

/// Standard role set seeded into new stores.
pub fn builtin_roles() -> Vec<(Role, Vec<String>)> {
    let role = |name: &'static str, perms: &[&str]| {
        (
            Role::new(name),
            perms.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        )
    };

    vec![
        role("admin", &["*"]),
        role("denied", &[]),
        role("status-only", &["api:status:read"]),
        role("readable", &["*:*:read"]),
        role("careportal", &["api:treatments:create"]),
        role("devicestatus-upload", &["api:devicestatus:create"]),
        role("activity", &["api:activity:create"]),
    ]
}

/// In-memory role/subject store for tests/dev.
#[derive(Debug)]
pub struct InMemoryAuthorizationStore {
    roles: RwLock<HashMap<Role, Vec<String>>>,
    subjects: RwLock<HashMap<String, Subject>>,
}

impl InMemoryAuthorizationStore {
    /// Store seeded with [`builtin_roles`] and no subjects.
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(builtin_roles().into_iter().collect()),
            subjects: RwLock::new(HashMap::new()),
        }
    }

    /// Store with no roles at all.
    pub fn empty() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            subjects: RwLock::new(HashMap::new()),
        }
    }

    /// Define or replace a role.
    pub fn upsert_role(&self, role: Role, permissions: Vec<String>) {
        self.roles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(role, permissions);
    }

    pub fn insert_subject(&self, subject: Subject) {
        self.subjects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject.access_token.clone(), subject);
    }

    /// Create a subject with a generated access token and store it.
    pub fn create_subject(&self, name: impl Into<String>, roles: Vec<Role>) -> Subject {
        let subject = Subject::new(name, roles);
        self.insert_subject(subject.clone());
        subject
    }

    /// All subjects, sorted by name.
    pub fn list_subjects(&self) -> Vec<Subject> {
        let mut subjects: Vec<Subject> = self
            .subjects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        subjects
    }
}

impl Default for InMemoryAuthorizationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationStorage for InMemoryAuthorizationStore {
    fn roles_to_permissions(&self, roles: &[Role]) -> Vec<String> {
        let map = self.roles.read().unwrap_or_else(PoisonError::into_inner);

        let mut seen = HashSet::new();
        roles
            .iter()
            .filter_map(|role| map.get(role))
            .flatten()
            .filter(|perm| seen.insert(perm.as_str()))
            .cloned()
            .collect()
    }

    fn find_subject(&self, access_token: &str) -> Option<Subject> {
        self.subjects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(access_token)
            .cloned()
    }
}
