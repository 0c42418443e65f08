//! # Content Engine
//!
//! Permission-scoped CRUD for a family of content resources (articles,
//! comments, pages, ...) that share one shape: an author, an optional
//! moderator, a publication flag and their own fields.
//!
//! ## Overview
//!
//! The interesting part is not CRUD but building queries that never return
//! records the caller may not see:
//!
//! ```text
//! User ──► ScopeEvaluator ──► AccessScope { view_all, view_unpublished, view_own }
//!                                   │
//!                                   ▼
//!               PredicateCompiler (owner fields, user id)
//!                                   │
//!                                   ▼
//!          AccessPredicate ──► QueryAssembler ◄── caller query (filters, sort, paging)
//!                                   │
//!                                   ▼
//!                      QuerySpec ──► PersistenceStore
//! ```
//!
//! - **Scope**: three concurrent permission lookups, namespaced by resource
//! - **Predicate**: the access filter, or a denial
//! - **Query**: access filter + caller filters + sort + clamped paging
//! - **Service**: list, count, read-one, create, update, delete
//! - **Guard**: not-found, visibility and ownership checks for single entities
//!
//! ## Usage
//!
//! ```rust,no_run
//! use content_engine::{ContentService, MemoryStore, User};
//! use content_rbac::{MemoryPermissionStore, PermissionKey, ResourceDescriptor};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let articles = ResourceDescriptor::shared("article", ["authorId"]);
//!     let permissions = MemoryPermissionStore::new();
//!     permissions.grant("reader", articles.permission(PermissionKey::ViewAll)).await;
//!
//!     let service = ContentService::new(articles, Arc::new(permissions), Arc::new(MemoryStore::new()));
//!
//!     let query = serde_json::from_value(json!({ "limit": 10, "orderBy": "title", "order": "asc" })).unwrap();
//!     let published = service.list(&User::new(1, ["reader"]), &query).await.unwrap();
//!     assert!(published.iter().all(|a| a.is_published));
//! }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod guard;
pub mod predicate;
pub mod query;
pub mod scope;
pub mod service;
pub mod store;
pub mod user;

// Re-export main types for convenience
pub use config::{ConfigError, QueryConfig};
pub use entity::{ContentEntity, EntityId};
pub use error::{CrudError, CrudResult};
pub use guard::EntityGuard;
pub use predicate::{AccessPredicate, FilterOp, FilterPredicate, FilterTerm, Join, PredicateCompiler};
pub use query::{AssembleOptions, CallerQuery, QueryAssembler, QuerySpec, Sort, SortDirection};
pub use scope::{AccessScope, ScopeEvaluator};
pub use service::ContentService;
pub use store::{MemoryStore, PersistenceStore, StoreError, StoreResult};
pub use user::{User, UserId};
