//! # Resource Descriptors
//!
//! Static, per-resource-type configuration. A descriptor names the resource
//! (the namespace for its permission keys) and lists the owner fields that
//! identify records belonging to the acting user.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::keys::PermissionKey;
use crate::permissions::Permission;

/// Configuration of one content resource type.
///
/// Owner fields are dot paths: `authorId` refers to a column on the record
/// itself, while `project.owner.id` walks the `project` and `owner` relations
/// before comparing `id`.
///
/// Descriptors are immutable once built and are usually shared behind an
/// [`Arc`] by every component that serves the resource.
///
/// # Example
///
/// ```
/// use content_rbac::resources::ResourceDescriptor;
/// use content_rbac::keys::PermissionKey;
///
/// let articles = ResourceDescriptor::new("article", ["authorId"]);
/// assert_eq!(articles.permission(PermissionKey::ViewAll).to_string(), "article:view_all");
/// assert_eq!(articles.owner_fields(), ["authorId"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: String,
    owner_fields: Vec<String>,
}

impl ResourceDescriptor {
    /// Create a descriptor.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name used to namespace permission keys
    /// * `owner_fields` - Ordered owner field paths
    pub fn new<I, S>(name: impl Into<String>, owner_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            owner_fields: owner_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a descriptor wrapped in an [`Arc`].
    pub fn shared<I, S>(name: impl Into<String>, owner_fields: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self::new(name, owner_fields))
    }

    /// Resource display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner field paths, in declaration order.
    pub fn owner_fields(&self) -> &[String] {
        &self.owner_fields
    }

    /// Check if any owner fields are declared.
    pub fn has_owner_fields(&self) -> bool {
        !self.owner_fields.is_empty()
    }

    /// Namespace a key with this resource's name.
    pub fn permission(&self, key: PermissionKey) -> Permission {
        Permission::new(self.name.clone(), key)
    }
}
