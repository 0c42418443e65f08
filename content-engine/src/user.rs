//! The acting principal.

use content_rbac::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// User identifier.
pub type UserId = i64;

/// A user acting on content.
///
/// Anonymous visitors still carry an id and roles (typically a guest role);
/// `is_authorized` tells registered principals apart from them.
///
/// # Examples
///
/// ```
/// use content_engine::User;
///
/// let editor = User::new(7, ["editor"]);
/// assert!(editor.is_authorized);
/// assert!(editor.has_role("editor"));
///
/// let guest = User::anonymous(0, ["guest"]);
/// assert!(!guest.is_authorized);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    pub id: UserId,

    /// Roles held by the user
    #[serde(default)]
    pub roles: HashSet<RoleId>,

    /// Whether the user is a registered, authenticated principal
    #[serde(default)]
    pub is_authorized: bool,
}

impl User {
    /// Create an authenticated user.
    pub fn new<I, S>(id: UserId, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        Self {
            id,
            roles: roles.into_iter().map(Into::into).collect(),
            is_authorized: true,
        }
    }

    /// Create an anonymous user.
    pub fn anonymous<I, S>(id: UserId, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        Self {
            is_authorized: false,
            ..Self::new(id, roles)
        }
    }

    /// Check if the user holds a role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
