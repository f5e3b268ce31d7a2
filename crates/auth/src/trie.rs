//! Hierarchical permission matcher.
//!
//! A [`PermissionTrie`] is compiled once from a set of permission strings and is
//! immutable afterwards. Tries are cheap enough to rebuild per request from
//! current role data and are never persisted.

use std::collections::BTreeMap;

use crate::permissions::{WILDCARD, parse_parts, well_formed};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    children: BTreeMap<String, Node>,
    /// A stored permission ends here; every more specific query is implied.
    terminal: bool,
}

impl Node {
    fn insert(&mut self, parts: &[Vec<&str>]) {
        match parts.split_first() {
            None => self.terminal = true,
            Some((alternatives, rest)) => {
                for alt in alternatives {
                    self.children
                        .entry((*alt).to_string())
                        .or_default()
                        .insert(rest);
                }
            }
        }
    }

    fn matches(&self, query: &[&str]) -> bool {
        if self.terminal {
            return true;
        }

        match query.split_first() {
            // Query is exhausted: only a run of trailing wildcards still grants it.
            None => self
                .children
                .get(WILDCARD)
                .is_some_and(|child| child.matches(&[])),
            Some((head, rest)) => {
                let exact = *head != WILDCARD
                    && self
                        .children
                        .get(*head)
                        .is_some_and(|child| child.matches(rest));

                exact
                    || self
                        .children
                        .get(WILDCARD)
                        .is_some_and(|child| child.matches(rest))
            }
        }
    }
}

/// Matcher over colon/wildcard-structured permission strings.
///
/// Multiple stored permissions are ORed; any match grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTrie {
    root: Node,
}

impl PermissionTrie {
    /// An empty trie never grants anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a trie from permission strings.
    ///
    /// Blank strings and strings with an empty part (`"api::read"`) are skipped.
    pub fn build<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut root = Node::default();
        for permission in permissions {
            let parts = parse_parts(permission.as_ref());
            if !well_formed(&parts) {
                continue;
            }
            root.insert(&parts);
        }
        Self { root }
    }

    /// Does any stored permission grant `query`?
    ///
    /// A query listing alternatives in a part is granted only if every
    /// alternative is granted.
    pub fn check(&self, query: &str) -> bool {
        let parts = parse_parts(query);
        if !well_formed(&parts) {
            return false;
        }

        expand(&parts)
            .iter()
            .all(|combination| self.root.matches(combination))
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && !self.root.terminal
    }
}

impl<S: AsRef<str>> FromIterator<S> for PermissionTrie {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::build(iter)
    }
}

/// Cartesian product of the alternatives of every part.
fn expand<'a>(parts: &[Vec<&'a str>]) -> Vec<Vec<&'a str>> {
    parts.iter().fold(vec![Vec::new()], |acc, alternatives| {
        acc.into_iter()
            .flat_map(|prefix| {
                alternatives.iter().map(move |alt| {
                    let mut next = prefix.clone();
                    next.push(*alt);
                    next
                })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_match() {
        let trie = PermissionTrie::build(["api:status:read"]);
        assert!(trie.check("api:status:read"));
        assert!(!trie.check("api:status:write"));
        assert!(!trie.check("api:entries:read"));
    }

    #[test]
    fn trailing_wildcard_grants_everything_beneath() {
        let trie = PermissionTrie::build(["users:*"]);
        assert!(trie.check("users:read"));
        assert!(trie.check("users:read:all"));
        assert!(trie.check("users"));
        assert!(!trie.check("groups:read"));
    }

    #[test]
    fn shorter_permission_implies_more_specific_queries() {
        let trie = PermissionTrie::build(["api:entries"]);
        assert!(trie.check("api:entries:read"));
        assert!(trie.check("api:entries:create:bulk"));
        assert!(!trie.check("api"));
    }

    #[test]
    fn inner_wildcard_matches_any_single_part() {
        let trie = PermissionTrie::build(["*:*:read"]);
        assert!(trie.check("api:entries:read"));
        assert!(trie.check("api:treatments:read"));
        assert!(!trie.check("api:entries:create"));
        assert!(!trie.check("api:entries"));
    }

    #[test]
    fn root_wildcard_grants_all() {
        let trie = PermissionTrie::build(["*"]);
        assert!(trie.check("anything"));
        assert!(trie.check("api:entries:delete"));
        assert!(!trie.check(""));
    }

    #[test]
    fn query_wildcard_needs_stored_wildcard() {
        let trie = PermissionTrie::build(["api:entries:read"]);
        assert!(!trie.check("api:*:read"));

        let trie = PermissionTrie::build(["api:*:read"]);
        assert!(trie.check("api:*:read"));
    }

    #[test]
    fn alternatives_in_stored_permission() {
        let trie = PermissionTrie::build(["api:entries,treatments:read"]);
        assert!(trie.check("api:entries:read"));
        assert!(trie.check("api:treatments:read"));
        assert!(!trie.check("api:profile:read"));
    }

    #[test]
    fn alternatives_in_query_require_all() {
        let trie = PermissionTrie::build(["api:entries:read"]);
        assert!(!trie.check("api:entries,treatments:read"));

        let trie = PermissionTrie::build(["api:entries:read", "api:treatments:*"]);
        assert!(trie.check("api:entries,treatments:read"));
    }

    #[test]
    fn multiple_permissions_are_ored() {
        let trie = PermissionTrie::build(["api:status:read", "api:entries:create"]);
        assert!(trie.check("api:status:read"));
        assert!(trie.check("api:entries:create"));
        assert!(!trie.check("api:entries:read"));
    }

    #[test]
    fn malformed_and_empty_inputs_never_grant() {
        let trie = PermissionTrie::build(["", "api::read"]);
        assert!(trie.is_empty());
        assert!(!trie.check("api::read"));
        assert!(!PermissionTrie::empty().check("api:status:read"));
    }

    fn permission_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,8}", 1..6)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every stored permission grants itself.
        #[test]
        fn stored_permission_grants_itself(parts in permission_strategy()) {
            let permission = parts.join(":");
            let trie = PermissionTrie::build([permission.as_str()]);
            prop_assert!(trie.check(&permission));
        }

        /// Property: a stored prefix (or prefix plus `*`) grants every extension.
        #[test]
        fn prefix_grants_extensions(parts in permission_strategy(), cut in 1usize..6) {
            let cut = cut.min(parts.len());
            let prefix = parts[..cut].join(":");
            let starred = format!("{prefix}:*");
            let query = parts.join(":");

            prop_assert!(PermissionTrie::build([prefix.as_str()]).check(&query));
            prop_assert!(PermissionTrie::build([starred.as_str()]).check(&query));
        }

        /// Property: a trie built from unrelated permissions does not grant.
        #[test]
        fn different_root_never_grants(parts in permission_strategy()) {
            let query = format!("zz{}", parts.join(":"));
            let trie = PermissionTrie::build([parts.join(":")]);
            prop_assert!(!trie.check(&query));
        }
    }
}
