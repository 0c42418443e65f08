//! Single-entity guards.
//!
//! Read-one, update and delete operate on an entity that has already been
//! located and authorized. These guards do that locating and authorizing so a
//! transport layer can chain them in front of [`crate::ContentService`].

use content_rbac::{PermissionKey, ResourceDescriptor};
use std::sync::Arc;

use crate::entity::{ContentEntity, EntityId};
use crate::error::{CrudError, CrudResult};
use crate::scope::ScopeEvaluator;
use crate::store::PersistenceStore;
use crate::user::User;

/// Not-found, visibility and ownership checks for one resource.
#[derive(Clone)]
pub struct EntityGuard {
    resource: Arc<ResourceDescriptor>,
    scope: ScopeEvaluator,
    store: Arc<dyn PersistenceStore>,
}

impl std::fmt::Debug for EntityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityGuard")
            .field("resource", &self.resource.name())
            .finish_non_exhaustive()
    }
}

impl EntityGuard {
    /// Create a guard.
    pub fn new(
        resource: Arc<ResourceDescriptor>,
        scope: ScopeEvaluator,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self {
            resource,
            scope,
            store,
        }
    }

    /// Load an entity by id.
    ///
    /// # Errors
    ///
    /// [`CrudError::NotFound`] when no such entity exists.
    pub async fn load(&self, id: EntityId) -> CrudResult<ContentEntity> {
        match self.store.find_by_id(id).await {
            Ok(Some(entity)) => Ok(entity),
            Ok(None) => Err(CrudError::NotFound),
            Err(e) => {
                tracing::error!(resource = self.resource.name(), id, error = %e, "Failed to load entity");
                Err(CrudError::unprocessable())
            }
        }
    }

    /// Ensure the user may see an entity.
    ///
    /// Published entities are visible with `view_all`, unpublished ones need
    /// `view_unpublished` as well; owned entities are visible with `view_own`.
    /// Hidden entities are reported as not found. `view_own` grants nothing on
    /// a resource without owner fields.
    pub async fn ensure_visible(&self, user: &User, entity: &ContentEntity) -> CrudResult<()> {
        let scope = self.scope.evaluate(user, &self.resource).await;
        let view_own = scope.view_own && self.resource.has_owner_fields();
        if !scope.view_all && !view_own {
            return Err(CrudError::Unauthorized);
        }

        let visible_to_all = scope.view_all && (entity.is_published || scope.view_unpublished);
        if visible_to_all || (view_own && self.owns(user, entity)) {
            Ok(())
        } else {
            Err(CrudError::NotFound)
        }
    }

    /// Ensure the user may perform `key` on an entity.
    ///
    /// View keys follow [`ensure_visible`](Self::ensure_visible). Owner-scoped
    /// keys only cover owned entities. Any other key grants access to every
    /// entity, and its owner-scoped variant (e.g. `edit_own` for `edit`)
    /// grants access to owned ones.
    pub async fn ensure_can(
        &self,
        user: &User,
        entity: &ContentEntity,
        key: PermissionKey,
    ) -> CrudResult<()> {
        if key.is_view() {
            return self.ensure_visible(user, entity).await;
        }

        let own = if key.is_owner_scoped() {
            Some(key)
        } else if self.scope.is_granted(user, &self.resource, key).await {
            return Ok(());
        } else {
            key.own_variant()
        };

        if let Some(own) = own {
            if self.owns(user, entity) && self.scope.is_granted(user, &self.resource, own).await {
                return Ok(());
            }
        }

        Err(CrudError::Forbidden)
    }

    /// Ensure the user may create entities.
    pub async fn ensure_can_add(&self, user: &User) -> CrudResult<()> {
        if self
            .scope
            .is_granted(user, &self.resource, PermissionKey::Add)
            .await
        {
            Ok(())
        } else {
            Err(CrudError::Forbidden)
        }
    }

    /// Load an entity and ensure the user may see it.
    pub async fn load_visible(&self, user: &User, id: EntityId) -> CrudResult<ContentEntity> {
        let entity = self.load(id).await?;
        self.ensure_visible(user, &entity).await?;
        Ok(entity)
    }

    /// Load an entity and ensure the user may perform `key` on it.
    pub async fn load_for(
        &self,
        user: &User,
        id: EntityId,
        key: PermissionKey,
    ) -> CrudResult<ContentEntity> {
        let entity = self.load(id).await?;
        self.ensure_can(user, &entity, key).await?;
        Ok(entity)
    }

    fn owns(&self, user: &User, entity: &ContentEntity) -> bool {
        entity.is_owned_by(self.resource.owner_fields(), user.id)
    }
}
