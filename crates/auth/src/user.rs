//! Authenticated user profile as returned by the identity API.
//!
//! The profile is a read model: the portal never edits it locally except by
//! replacing it wholesale through [`crate::SessionStore::update_user`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::roles::{self, Role};

/// Identifier assigned by the identity service.
///
/// Services disagree on numeric vs. string ids, so both are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{id}"),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// Identity attached to an authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Missing or unrecognised roles load as [`Role::Guest`].
    #[serde(default, deserialize_with = "roles::deserialize_lenient")]
    pub role: Role,

    /// Fields the portal does not interpret (display name, avatar, ...).
    /// Kept so persistence round-trips the profile unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: None,
            role,
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Username suitable for display, if the profile carries a non-blank one.
    pub fn display_username(&self) -> Option<&str> {
        let name = self.username.trim();
        (!name.is_empty()).then_some(name)
    }
}
