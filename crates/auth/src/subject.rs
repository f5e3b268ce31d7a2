use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Role;

/// An identity that can be issued tokens.
///
/// Subjects are owned by the storage collaborator and read-only to the
/// authorization core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Opaque identifier exchanged for a signed token.
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub name: String,
    pub roles: Vec<Role>,
}

impl Subject {
    /// Create a subject with a freshly generated access token.
    pub fn new(name: impl Into<String>, roles: Vec<Role>) -> Self {
        let name = name.into();
        let access_token = generate_access_token(&name);
        Self {
            access_token,
            name,
            roles,
        }
    }
}

/// `<abbreviated name>-<16 hex chars>`, e.g. `careportal-1a2b3c4d5e6f7a8b`.
fn generate_access_token(name: &str) -> String {
    let abbrev: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();

    let hex = Uuid::now_v7().simple().to_string();
    // The tail of a v7 uuid carries the random bits.
    let suffix = &hex[hex.len() - 16..];

    if abbrev.is_empty() {
        suffix.to_string()
    } else {
        format!("{abbrev}-{suffix}")
    }
}
