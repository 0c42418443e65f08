//! # Permissions
//!
//! Namespaced permissions and permission sets.
//! A permission combines a resource name with a [`PermissionKey`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::keys::PermissionKey;

/// A permission key namespaced by a resource name.
///
/// # Example
///
/// ```
/// use content_rbac::permissions::Permission;
/// use content_rbac::keys::PermissionKey;
///
/// let perm = Permission::new("article", PermissionKey::ViewOwn);
/// assert_eq!(perm.to_string(), "article:view_own");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The resource name this permission is namespaced by.
    pub resource: String,
    /// The abstract key being granted.
    pub key: PermissionKey,
}

impl Permission {
    /// Create a new namespaced permission.
    pub fn new(resource: impl Into<String>, key: PermissionKey) -> Self {
        Self {
            resource: resource.into(),
            key,
        }
    }

    /// Parse from string (e.g., "article:view_all").
    ///
    /// The key is taken from the last `:`-separated segment, so resource
    /// names may themselves contain colons.
    ///
    /// # Returns
    ///
    /// `Some(Permission)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use content_rbac::permissions::Permission;
    /// use content_rbac::keys::PermissionKey;
    ///
    /// let perm = Permission::from_string("blog:post:edit_own").unwrap();
    /// assert_eq!(perm.resource, "blog:post");
    /// assert_eq!(perm.key, PermissionKey::EditOwn);
    /// ```
    pub fn from_string(s: &str) -> Option<Self> {
        let (resource, key) = s.rsplit_once(':')?;
        if resource.is_empty() {
            return None;
        }

        Some(Self {
            resource: resource.to_string(),
            key: PermissionKey::parse(key)?,
        })
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.key.as_str())
    }
}

/// A set of permissions granted to a role.
///
/// Uses the namespaced string representation for storage and comparison.
///
/// # Example
///
/// ```
/// use content_rbac::permissions::{Permission, PermissionSet};
/// use content_rbac::keys::PermissionKey;
///
/// let mut set = PermissionSet::new();
/// set.add(Permission::new("article", PermissionKey::ViewAll));
/// set.add(Permission::new("article", PermissionKey::Add));
///
/// assert!(set.has(&Permission::new("article", PermissionKey::ViewAll)));
/// assert!(!set.has(&Permission::new("comment", PermissionKey::ViewAll)));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: HashSet<String>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self {
            permissions: HashSet::new(),
        }
    }

    /// Add a permission to the set.
    pub fn add(&mut self, permission: Permission) {
        self.permissions.insert(permission.to_string());
    }

    /// Add multiple permissions to the set.
    pub fn add_all<I>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = Permission>,
    {
        for perm in permissions {
            self.add(perm);
        }
    }

    /// Grant several keys on one resource.
    pub fn grant(&mut self, resource: &str, keys: &[PermissionKey]) {
        for key in keys {
            self.add(Permission::new(resource, *key));
        }
    }

    /// Remove a permission from the set.
    ///
    /// # Returns
    ///
    /// `true` if the permission was present, `false` otherwise
    pub fn remove(&mut self, permission: &Permission) -> bool {
        self.permissions.remove(&permission.to_string())
    }

    /// Check if the set contains a permission.
    ///
    /// Keys never imply one another: `ViewAll` does not grant `ViewOwn`.
    pub fn has(&self, permission: &Permission) -> bool {
        self.permissions.contains(&permission.to_string())
    }

    /// Get all permissions in the set.
    pub fn all(&self) -> Vec<Permission> {
        self.permissions
            .iter()
            .filter_map(|s| Permission::from_string(s))
            .collect()
    }

    /// Merge another permission set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        for perm in &other.permissions {
            self.permissions.insert(perm.clone());
        }
    }

    /// Create from a list of permission strings.
    ///
    /// Unparsable entries are skipped.
    ///
    /// # Example
    ///
    /// ```
    /// use content_rbac::permissions::PermissionSet;
    ///
    /// let set = PermissionSet::from_strings(&["article:view_all", "article:bogus"]);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn from_strings(perms: &[&str]) -> Self {
        let mut set = Self::new();
        for perm in perms {
            if let Some(p) = Permission::from_string(perm) {
                set.add(p);
            }
        }
        set
    }

    /// Get the count of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = PermissionSet::new();
        set.add_all(iter);
        set
    }
}
