//! # Permission Resolution
//!
//! The [`PermissionResolver`] trait is the seam to whatever store holds role
//! grants. Resolving a namespaced permission yields a [`PermissionRecord`]
//! listing the roles it is granted to; the caller then intersects that with
//! the acting user's roles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionSet};

/// Role identifier as stored on users and grants.
pub type RoleId = String;

/// A resolved permission and the roles holding it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionRecord {
    /// The namespaced permission.
    pub permission: Permission,
    /// Roles the permission is granted to.
    pub roles: HashSet<RoleId>,
}

impl PermissionRecord {
    /// Create a record.
    pub fn new(permission: Permission, roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            permission,
            roles: roles.into_iter().collect(),
        }
    }

    /// Check if any of the given roles holds this permission.
    pub fn is_granted_for(&self, roles: &HashSet<RoleId>) -> bool {
        !self.roles.is_disjoint(roles)
    }
}

/// Lookup of role grants for namespaced permissions.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Resolve a namespaced permission.
    ///
    /// Returns `Ok(None)` when no role holds the permission.
    async fn resolve(&self, permission: &Permission) -> RbacResult<Option<PermissionRecord>>;

    /// Intersect a resolved record with a role set.
    fn is_granted_for_roles(&self, record: &PermissionRecord, roles: &HashSet<RoleId>) -> bool {
        record.is_granted_for(roles)
    }

    /// Resolve and intersect in one step.
    async fn is_granted(&self, permission: &Permission, roles: &HashSet<RoleId>) -> RbacResult<bool> {
        Ok(self
            .resolve(permission)
            .await?
            .is_some_and(|record| self.is_granted_for_roles(&record, roles)))
    }
}

/// In-memory role grant store.
///
/// Suitable for tests and for deployments with a static role table.
///
/// # Example
///
/// ```
/// use content_rbac::{MemoryPermissionStore, Permission, PermissionKey, PermissionResolver};
/// use std::collections::HashSet;
///
/// # async fn example() {
/// let store = MemoryPermissionStore::new();
/// store.grant("editor", Permission::new("article", PermissionKey::ViewAll)).await;
///
/// let roles: HashSet<String> = ["editor".to_string()].into();
/// let granted = store
///     .is_granted(&Permission::new("article", PermissionKey::ViewAll), &roles)
///     .await
///     .unwrap();
/// assert!(granted);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    grants: RwLock<HashMap<RoleId, PermissionSet>>,
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with role grants.
    ///
    /// Repeated roles accumulate their permissions.
    pub fn with_roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = (RoleId, PermissionSet)>,
    {
        let mut grants: HashMap<RoleId, PermissionSet> = HashMap::new();
        for (role, set) in roles {
            grants.entry(role).or_default().merge(&set);
        }

        Self {
            grants: RwLock::new(grants),
        }
    }

    /// Grant a permission to a role.
    pub async fn grant(&self, role: impl Into<RoleId>, permission: Permission) {
        self.grants
            .write()
            .await
            .entry(role.into())
            .or_default()
            .add(permission);
    }

    /// Grant a permission given in its string form (e.g. `"article:view_all"`).
    pub async fn grant_str(&self, role: impl Into<RoleId>, permission: &str) -> RbacResult<()> {
        let permission = Permission::from_string(permission)
            .ok_or_else(|| RbacError::InvalidPermission(permission.to_string()))?;
        self.grant(role, permission).await;
        Ok(())
    }

    /// Revoke a permission from a role.
    ///
    /// # Returns
    ///
    /// `true` if the role held the permission
    pub async fn revoke(&self, role: &str, permission: &Permission) -> bool {
        self.grants
            .write()
            .await
            .get_mut(role)
            .is_some_and(|set| set.remove(permission))
    }

    /// Get the permissions granted to a role.
    pub async fn role_permissions(&self, role: &str) -> Option<PermissionSet> {
        self.grants.read().await.get(role).cloned()
    }
}

#[async_trait]
impl PermissionResolver for MemoryPermissionStore {
    async fn resolve(&self, permission: &Permission) -> RbacResult<Option<PermissionRecord>> {
        let grants = self.grants.read().await;
        let roles: HashSet<RoleId> = grants
            .iter()
            .filter(|(_, set)| set.has(permission))
            .map(|(role, _)| role.clone())
            .collect();

        if roles.is_empty() {
            return Ok(None);
        }

        Ok(Some(PermissionRecord {
            permission: permission.clone(),
            roles,
        }))
    }
}
