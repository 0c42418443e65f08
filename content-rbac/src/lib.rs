//! # Content RBAC
//!
//! Permission vocabulary and role grants for content resources.
//!
//! ## Overview
//!
//! The content-rbac crate handles:
//! - **Keys**: The abstract permissions every content resource supports
//! - **Permissions**: Keys namespaced by a resource name
//! - **Resources**: Per-resource descriptors (name + owner fields)
//! - **Resolution**: Looking up which roles hold a permission
//!
//! ## Architecture
//!
//! ```text
//! Permission = Resource name + Key
//!
//! Examples:
//!   "article:view_all"          - View every published article
//!   "article:view_unpublished"  - Also view drafts (with view_all)
//!   "comment:edit_own"          - Edit comments the user owns
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use content_rbac::{MemoryPermissionStore, PermissionKey, PermissionResolver, ResourceDescriptor};
//! use std::collections::HashSet;
//!
//! async fn example() {
//!     let articles = ResourceDescriptor::new("article", ["authorId"]);
//!     let store = MemoryPermissionStore::new();
//!     store.grant("author", articles.permission(PermissionKey::ViewOwn)).await;
//!
//!     let roles: HashSet<String> = ["author".to_string()].into();
//!     let can_view_own = store
//!         .is_granted(&articles.permission(PermissionKey::ViewOwn), &roles)
//!         .await
//!         .unwrap();
//!     assert!(can_view_own);
//! }
//! ```

pub mod error;
pub mod keys;
pub mod permissions;
pub mod resolver;
pub mod resources;

// Re-export main types for convenience
pub use error::{RbacError, RbacResult};
pub use keys::PermissionKey;
pub use permissions::{Permission, PermissionSet};
pub use resolver::{MemoryPermissionStore, PermissionRecord, PermissionResolver, RoleId};
pub use resources::ResourceDescriptor;
