use std::collections::BTreeSet;
use std::sync::RwLock;

use crate::{Permission, PermissionTrie};

/// Every permission the application has declared on a route.
///
/// One registry exists per authorization subsystem instance. It is sorted and
/// deduplicated, grows monotonically, and is only written while routes are
/// being registered. Request handling never touches it.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    seen: RwLock<BTreeSet<Permission>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declared permission. Declaring the same string twice is a no-op.
    ///
    /// Malformed permissions (blank, or with an empty part) can never be granted,
    /// so they are logged and left out.
    pub fn declare(&self, permission: impl Into<Permission>) {
        let permission = permission.into();
        if !permission.is_well_formed() {
            tracing::warn!(%permission, "ignoring malformed permission declaration");
            return;
        }
        match self.seen.write() {
            Ok(mut seen) => {
                if seen.insert(permission.clone()) {
                    tracing::debug!(%permission, "declared permission");
                }
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(permission);
            }
        }
    }

    /// Sorted snapshot of the declared permissions.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.seen.read() {
            Ok(seen) => seen.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self.seen.read() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trie over every declared permission, for introspection.
    pub fn expand(&self) -> PermissionTrie {
        self.permissions().iter().map(Permission::as_str).collect()
    }
}
