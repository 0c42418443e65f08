//! Persistence collaborator.
//!
//! [`PersistenceStore`] executes assembled [`QuerySpec`]s and stores
//! entities. [`MemoryStore`] is an in-process implementation used by tests
//! and small deployments.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::entity::{ContentEntity, EntityId};
use crate::query::{QuerySpec, SortDirection};

/// Persistence error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the entity
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(String),

    /// No entity with this id exists
    #[error("Entity {0} not found")]
    NotFound(EntityId),

    /// The entity has not been persisted yet
    #[error("Entity has no id")]
    MissingId,

    /// The query cannot be executed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for one content resource.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Fetch the page of entities matching the query.
    async fn find(&self, spec: &QuerySpec) -> StoreResult<Vec<ContentEntity>>;

    /// Count all entities matching the query, ignoring pagination.
    async fn count(&self, spec: &QuerySpec) -> StoreResult<u64>;

    /// Fetch an entity by id.
    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<ContentEntity>>;

    /// Insert or update an entity, returning it as stored.
    ///
    /// Entities without an id are inserted and assigned one.
    async fn save(&self, entity: ContentEntity) -> StoreResult<ContentEntity>;

    /// Remove an entity, returning it as it was stored.
    async fn remove(&self, entity: &ContentEntity) -> StoreResult<ContentEntity>;
}

/// In-memory store.
///
/// Relations are expected to be embedded in the entity as nested objects,
/// which is what join paths and dot-path filters walk into.
///
/// # Example
///
/// ```
/// use content_engine::{ContentEntity, MemoryStore, PersistenceStore};
/// use serde_json::json;
///
/// # async fn example() {
/// let store = MemoryStore::new().with_unique_fields(["slug"]);
/// let saved = store
///     .save(ContentEntity::new().with_field("slug", json!("hello")))
///     .await
///     .unwrap();
/// assert_eq!(saved.id, Some(1));
///
/// let duplicate = store.save(ContentEntity::new().with_field("slug", json!("hello"))).await;
/// assert!(duplicate.is_err());
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<EntityId, ContentEntity>>,
    next_id: AtomicI64,
    unique_fields: Vec<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            unique_fields: Vec::new(),
        }
    }

    /// Declare fields whose non-null values must be unique.
    pub fn with_unique_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Number of stored entities.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Every join must hang off the root or an earlier join.
    fn check_joins(spec: &QuerySpec) -> StoreResult<()> {
        let mut declared = HashSet::new();
        for join in &spec.joins {
            if let Some(parent) = &join.parent {
                if !declared.contains(parent.as_str()) {
                    return Err(StoreError::InvalidQuery(format!(
                        "join {} references undeclared parent {}",
                        join.path, parent
                    )));
                }
            }
            declared.insert(join.path.as_str());
        }
        Ok(())
    }

    fn check_unique(
        &self,
        records: &BTreeMap<EntityId, ContentEntity>,
        entity: &ContentEntity,
    ) -> StoreResult<()> {
        for field in &self.unique_fields {
            let value = match entity.value_at(field) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };
            let taken = records.values().any(|other| {
                other.id != entity.id && other.value_at(field).as_ref() == Some(&value)
            });
            if taken {
                return Err(StoreError::UniqueViolation(field.clone()));
            }
        }
        Ok(())
    }
}

/// Null and missing values sort first; mixed types compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn find(&self, spec: &QuerySpec) -> StoreResult<Vec<ContentEntity>> {
        Self::check_joins(spec)?;

        let records = self.records.read().await;
        let mut matching: Vec<&ContentEntity> =
            records.values().filter(|entity| spec.matches(entity)).collect();

        if let Some(sort) = &spec.sort {
            matching.sort_by_cached_key(|entity| SortKey(entity.value_at(&sort.field)));
            if sort.direction == SortDirection::Desc {
                matching.reverse();
            }
        }

        let offset = usize::try_from(spec.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(spec.limit).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, spec: &QuerySpec) -> StoreResult<u64> {
        Self::check_joins(spec)?;

        let records = self.records.read().await;
        let count = records.values().filter(|entity| spec.matches(entity)).count();
        Ok(count as u64)
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<ContentEntity>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save(&self, mut entity: ContentEntity) -> StoreResult<ContentEntity> {
        let mut records = self.records.write().await;
        self.check_unique(&records, &entity)?;

        let id = match entity.id {
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), AtomicOrdering::SeqCst);
                id
            }
            None => self.next_id.fetch_add(1, AtomicOrdering::SeqCst),
        };
        entity.id = Some(id);
        records.insert(id, entity.clone());

        tracing::debug!(id, "Saved entity");
        Ok(entity)
    }

    async fn remove(&self, entity: &ContentEntity) -> StoreResult<ContentEntity> {
        let id = entity.id.ok_or(StoreError::MissingId)?;
        self.records
            .write()
            .await
            .remove(&id)
            .ok_or(StoreError::NotFound(id))
    }
}

/// Orders optional JSON values with [`compare_values`].
struct SortKey(Option<Value>);

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_values(self.0.as_ref(), other.0.as_ref())
    }
}
