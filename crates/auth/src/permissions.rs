use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Separator between the hierarchical parts of a permission string.
pub const PART_DIVIDER: char = ':';

/// Separator between alternatives inside a single part.
pub const SUBPART_DIVIDER: char = ',';

/// Wildcard part: matches any value at its position and, as the last part of a
/// stored permission, everything beneath it.
pub const WILDCARD: &str = "*";

/// Permission identifier.
///
/// Permissions are colon-structured strings (e.g. `"api:entries:read"`).
/// A part may be `*` or list alternatives separated by commas
/// (`"api:entries,treatments:read"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }

    /// Split into parts, each part split into its alternatives.
    ///
    /// Empty alternatives are dropped; a permission with no content yields no parts.
    pub fn parts(&self) -> Vec<Vec<&str>> {
        parse_parts(self.as_str())
    }

    /// Non-blank, and every part has at least one alternative.
    ///
    /// Only well-formed permissions can ever be stored in or granted by a trie.
    pub fn is_well_formed(&self) -> bool {
        well_formed(&self.parts())
    }
}

pub(crate) fn well_formed(parts: &[Vec<&str>]) -> bool {
    !parts.is_empty() && parts.iter().all(|part| !part.is_empty())
}

pub(crate) fn parse_parts(raw: &str) -> Vec<Vec<&str>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    raw.split(PART_DIVIDER)
        .map(|part| {
            part.split(SUBPART_DIVIDER)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .collect()
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
