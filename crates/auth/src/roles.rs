use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier.
///
/// Roles are opaque names at this layer; mapping roles to permissions is the
/// storage collaborator's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a role list separated by commas, colons or spaces.
///
/// `"readable, careportal:activity"` yields three roles; empty entries are dropped.
pub fn parse_role_list(raw: &str) -> Vec<Role> {
    raw.split([',', ':', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Role::new(s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_list_accepts_all_separators() {
        let roles = parse_role_list("readable,careportal:activity status-only");
        let names: Vec<_> = roles.iter().map(Role::as_str).collect();
        assert_eq!(names, vec!["readable", "careportal", "activity", "status-only"]);
    }

    #[test]
    fn role_list_drops_empty_entries() {
        assert!(parse_role_list("").is_empty());
        assert_eq!(parse_role_list(" ,readable,, ").len(), 1);
    }
}
