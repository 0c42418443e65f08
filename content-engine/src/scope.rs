//! Access scope evaluation.
//!
//! Reduces a user's role grants to the three view permissions that drive
//! query filtering for one resource.

use content_rbac::{PermissionKey, PermissionResolver, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::user::User;

/// What a user may see of one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessScope {
    /// `view_all` is granted
    pub view_all: bool,
    /// `view_unpublished` is granted
    pub view_unpublished: bool,
    /// `view_own` is granted
    pub view_own: bool,
}

impl AccessScope {
    /// Create a scope from the three view grants.
    pub fn new(view_all: bool, view_unpublished: bool, view_own: bool) -> Self {
        Self {
            view_all,
            view_unpublished,
            view_own,
        }
    }

    /// Check if the user may see at least some records.
    ///
    /// `view_unpublished` alone grants nothing.
    pub fn can_view_any(&self) -> bool {
        self.view_all || self.view_own
    }
}

/// Evaluates permission grants for a user against a resource.
#[derive(Clone)]
pub struct ScopeEvaluator {
    resolver: Arc<dyn PermissionResolver>,
}

impl std::fmt::Debug for ScopeEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeEvaluator").finish_non_exhaustive()
    }
}

impl ScopeEvaluator {
    /// Create an evaluator backed by a permission resolver.
    pub fn new(resolver: Arc<dyn PermissionResolver>) -> Self {
        Self { resolver }
    }

    /// Evaluate the view scope of a user for a resource.
    ///
    /// The three lookups run concurrently. This never fails: a permission
    /// that is absent, or whose lookup errors, counts as not granted.
    pub async fn evaluate(&self, user: &User, resource: &ResourceDescriptor) -> AccessScope {
        let (view_all, view_unpublished, view_own) = tokio::join!(
            self.is_granted(user, resource, PermissionKey::ViewAll),
            self.is_granted(user, resource, PermissionKey::ViewUnpublished),
            self.is_granted(user, resource, PermissionKey::ViewOwn),
        );

        let scope = AccessScope::new(view_all, view_unpublished, view_own);
        tracing::debug!(
            resource = resource.name(),
            user_id = user.id,
            view_all,
            view_unpublished,
            view_own,
            "Evaluated access scope"
        );
        scope
    }

    /// Check a single key for a user on a resource.
    pub async fn is_granted(
        &self,
        user: &User,
        resource: &ResourceDescriptor,
        key: PermissionKey,
    ) -> bool {
        let permission = resource.permission(key);
        match self.resolver.resolve(&permission).await {
            Ok(Some(record)) => self.resolver.is_granted_for_roles(&record, &user.roles),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    permission = %permission,
                    error = %e,
                    "Permission lookup failed, treating as not granted"
                );
                false
            }
        }
    }
}
