//! CRUD orchestration for one content resource.

use chrono::Utc;
use content_rbac::{PermissionResolver, ResourceDescriptor};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::entity::ContentEntity;
use crate::error::{CrudError, CrudResult};
use crate::guard::EntityGuard;
use crate::predicate::{AccessPredicate, PredicateCompiler};
use crate::query::{AssembleOptions, CallerQuery, QueryAssembler, QuerySpec};
use crate::scope::ScopeEvaluator;
use crate::store::{PersistenceStore, StoreError};
use crate::user::User;

/// Permission-scoped CRUD over one content resource.
///
/// Listing and counting compile the user's permissions into a filter before
/// anything reaches the store. Single-entity operations expect the entity to
/// have been located and authorized already, see [`EntityGuard`].
///
/// # Example
///
/// ```
/// use content_engine::{ContentEntity, ContentService, MemoryStore, User};
/// use content_rbac::{MemoryPermissionStore, PermissionKey, ResourceDescriptor};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let articles = ResourceDescriptor::shared("article", ["authorId"]);
/// let permissions = MemoryPermissionStore::new();
/// permissions.grant("author", articles.permission(PermissionKey::ViewOwn)).await;
///
/// let service = ContentService::new(
///     articles,
///     Arc::new(permissions),
///     Arc::new(MemoryStore::new()),
/// );
///
/// let author = User::new(7, ["author"]);
/// service.create(&author, ContentEntity::new()).await.unwrap();
/// let mine = service.list(&author, &Default::default()).await.unwrap();
/// assert_eq!(mine.len(), 1);
/// # }
/// ```
#[derive(Clone)]
pub struct ContentService {
    resource: Arc<ResourceDescriptor>,
    scope: ScopeEvaluator,
    assembler: QueryAssembler,
    store: Arc<dyn PersistenceStore>,
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService")
            .field("resource", &self.resource.name())
            .field("config", self.assembler.config())
            .finish_non_exhaustive()
    }
}

impl ContentService {
    /// Create a service with the default query configuration.
    pub fn new(
        resource: Arc<ResourceDescriptor>,
        resolver: Arc<dyn PermissionResolver>,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self {
            resource,
            scope: ScopeEvaluator::new(resolver),
            assembler: QueryAssembler::default(),
            store,
        }
    }

    /// Replace the query configuration.
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.assembler = QueryAssembler::new(config);
        self
    }

    /// The resource this service serves.
    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    /// Guards for single-entity operations on this resource.
    pub fn guard(&self) -> EntityGuard {
        EntityGuard::new(self.resource.clone(), self.scope.clone(), self.store.clone())
    }

    /// Build the query a user's list or count request would execute.
    ///
    /// # Errors
    ///
    /// [`CrudError::Unauthorized`] when the user holds neither `view_all` nor
    /// `view_own`; [`CrudError::UnprocessableEntity`] for malformed paging.
    pub async fn query_spec(&self, user: &User, query: &CallerQuery) -> CrudResult<QuerySpec> {
        let scope = self.scope.evaluate(user, &self.resource).await;
        let access = PredicateCompiler::new(&self.resource).compile(&scope, user.id);
        self.assembler.assemble(access, query, AssembleOptions::default())
    }

    /// List the entities the user may see.
    pub async fn list(&self, user: &User, query: &CallerQuery) -> CrudResult<Vec<ContentEntity>> {
        let spec = self.query_spec(user, query).await?;
        self.execute_find(&spec).await
    }

    /// Count the entities the user may see.
    pub async fn count(&self, user: &User, query: &CallerQuery) -> CrudResult<u64> {
        let spec = self.query_spec(user, query).await?;
        self.execute_count(&spec).await
    }

    /// List entities without any permission restriction.
    ///
    /// Meant for internal callers that have authorized the request by other
    /// means.
    pub async fn list_unrestricted(&self, query: &CallerQuery) -> CrudResult<Vec<ContentEntity>> {
        let spec = self.unrestricted_spec(query)?;
        self.execute_find(&spec).await
    }

    /// Count entities without any permission restriction.
    pub async fn count_unrestricted(&self, query: &CallerQuery) -> CrudResult<u64> {
        let spec = self.unrestricted_spec(query)?;
        self.execute_count(&spec).await
    }

    /// Return an entity the guards already located and authorized.
    pub fn read_one(&self, entity: ContentEntity) -> ContentEntity {
        entity
    }

    /// Create an entity.
    ///
    /// Authorized users become author and moderator; anonymous submissions
    /// have neither. Any client-supplied id is discarded.
    ///
    /// # Errors
    ///
    /// [`CrudError::Conflict`] on a unique constraint violation,
    /// [`CrudError::UnprocessableEntity`] with a generic message on any other
    /// persistence failure.
    pub async fn create(&self, user: &User, mut entity: ContentEntity) -> CrudResult<ContentEntity> {
        let stamp = user.is_authorized.then_some(user.id);
        let now = Utc::now();
        entity.id = None;
        entity.author_id = stamp;
        entity.moderator_id = stamp;
        entity.created_at = Some(now);
        entity.updated_at = Some(now);

        match self.store.save(entity).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::UniqueViolation(field)) => {
                tracing::info!(resource = self.resource.name(), field = %field, "Duplicate entity rejected");
                Err(CrudError::conflict())
            }
            Err(e) => {
                tracing::error!(resource = self.resource.name(), error = %e, "Failed to create entity");
                Err(CrudError::unprocessable())
            }
        }
    }

    /// Update an entity the guards already located and authorized.
    ///
    /// `id`, `authorId` and `createdAt` are kept from `current`, the acting
    /// user becomes moderator, and every other submitted field overwrites the
    /// current value.
    ///
    /// A persistence failure is logged and NOT reported: the merged entity is
    /// returned as if it had been saved. Callers that need to know must
    /// re-read the entity.
    ///
    /// # Errors
    ///
    /// [`CrudError::UnprocessableEntity`] when a submitted value does not fit
    /// the entity envelope (e.g. a non-boolean `isPublished`).
    pub async fn update(
        &self,
        user: &User,
        current: ContentEntity,
        submitted: &Map<String, Value>,
    ) -> CrudResult<ContentEntity> {
        let mut merged = current.overlay(submitted).map_err(|e| {
            tracing::debug!(resource = self.resource.name(), error = %e, "Rejected update payload");
            CrudError::invalid("Invalid entity payload")
        })?;
        merged.id = current.id;
        merged.author_id = current.author_id;
        merged.moderator_id = Some(user.id);
        merged.created_at = current.created_at;
        merged.updated_at = Some(Utc::now());

        match self.store.save(merged.clone()).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                tracing::error!(
                    resource = self.resource.name(),
                    id = ?current.id,
                    error = %e,
                    "Failed to update entity"
                );
                Ok(merged)
            }
        }
    }

    /// Delete an entity the guards already located and authorized.
    ///
    /// # Errors
    ///
    /// [`CrudError::NotFound`] when the entity is already gone,
    /// [`CrudError::UnprocessableEntity`] on other persistence failures.
    pub async fn delete(&self, entity: ContentEntity) -> CrudResult<ContentEntity> {
        self.store.remove(&entity).await.map_err(|e| match e {
            StoreError::NotFound(_) | StoreError::MissingId => CrudError::NotFound,
            other => {
                tracing::error!(resource = self.resource.name(), error = %other, "Failed to delete entity");
                CrudError::unprocessable()
            }
        })
    }

    fn unrestricted_spec(&self, query: &CallerQuery) -> CrudResult<QuerySpec> {
        self.assembler
            .assemble(AccessPredicate::Denied, query, AssembleOptions::bypass())
    }

    async fn execute_find(&self, spec: &QuerySpec) -> CrudResult<Vec<ContentEntity>> {
        self.store.find(spec).await.map_err(|e| {
            tracing::error!(resource = self.resource.name(), error = %e, "Failed to list entities");
            CrudError::unprocessable()
        })
    }

    async fn execute_count(&self, spec: &QuerySpec) -> CrudResult<u64> {
        self.store.count(spec).await.map_err(|e| {
            tracing::error!(resource = self.resource.name(), error = %e, "Failed to count entities");
            CrudError::unprocessable()
        })
    }
}
