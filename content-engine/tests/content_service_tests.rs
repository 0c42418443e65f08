//! End-to-end tests for permission-scoped content operations.
//!
//! These tests drive `ContentService` and `EntityGuard` over the in-memory
//! store and permission store, verifying what each kind of user can see and
//! how create/update/delete stamp and persist entities.
//!
//! Roles used throughout:
//! - `reader`: view_all
//! - `editor`: view_all + view_unpublished + edit + remove
//! - `author`: view_own + add + edit_own + remove_own
//! - `reviewer`: view_all + view_own
//! - `guest`: nothing

use async_trait::async_trait;
use content_engine::{
    CallerQuery, ContentEntity, ContentService, CrudError, EntityId, FilterPredicate,
    MemoryStore, PersistenceStore, QueryConfig, QuerySpec, StoreError, StoreResult, User,
};
use content_rbac::{MemoryPermissionStore, PermissionKey, PermissionSet, ResourceDescriptor};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Test fixture with a seeded article store.
struct TestFixture {
    /// Article store.
    store: Arc<MemoryStore>,
    /// Service under test.
    service: ContentService,
}

impl TestFixture {
    /// Create a fixture for a resource owned through `authorId`.
    async fn new() -> Self {
        Self::with_resource(ResourceDescriptor::shared("article", ["authorId"])).await
    }

    /// Create a fixture for an arbitrary resource descriptor.
    async fn with_resource(resource: Arc<ResourceDescriptor>) -> Self {
        let name = resource.name().to_string();
        let grants = |keys: &[PermissionKey]| {
            let mut set = PermissionSet::new();
            set.grant(&name, keys);
            set
        };

        let permissions = MemoryPermissionStore::with_roles([
            ("reader".to_string(), grants(&[PermissionKey::ViewAll])),
            (
                "editor".to_string(),
                grants(&[
                    PermissionKey::ViewAll,
                    PermissionKey::ViewUnpublished,
                    PermissionKey::Edit,
                    PermissionKey::Remove,
                ]),
            ),
            (
                "author".to_string(),
                grants(&[
                    PermissionKey::ViewOwn,
                    PermissionKey::Add,
                    PermissionKey::EditOwn,
                    PermissionKey::RemoveOwn,
                ]),
            ),
            (
                "reviewer".to_string(),
                grants(&[PermissionKey::ViewAll, PermissionKey::ViewOwn]),
            ),
        ]);

        let store = Arc::new(MemoryStore::new().with_unique_fields(["slug"]));
        let service = ContentService::new(resource, Arc::new(permissions), store.clone());

        Self { store, service }
    }

    /// Seed one article directly into the store.
    async fn seed(&self, author: Option<i64>, published: bool, title: &str) -> ContentEntity {
        self.store
            .save(
                ContentEntity {
                    author_id: author,
                    moderator_id: author,
                    is_published: published,
                    ..ContentEntity::default()
                }
                .with_field("title", json!(title)),
            )
            .await
            .unwrap()
    }

    /// Seed the standard data set:
    /// 1 "mine-draft" (author 7, draft), 2 "mine-live" (author 7, published),
    /// 3 "other-draft" (author 8, draft), 4 "other-live" (author 8, published).
    async fn seeded() -> Self {
        let fixture = Self::new().await;
        fixture.seed(Some(7), false, "mine-draft").await;
        fixture.seed(Some(7), true, "mine-live").await;
        fixture.seed(Some(8), false, "other-draft").await;
        fixture.seed(Some(8), true, "other-live").await;
        fixture
    }
}

fn query(value: Value) -> CallerQuery {
    serde_json::from_value(value).unwrap()
}

fn titles(entities: &[ContentEntity]) -> Vec<String> {
    let mut titles: Vec<String> = entities
        .iter()
        .filter_map(|e| e.fields.get("title").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    titles.sort();
    titles
}

// ============================================================================
// List / count
// ============================================================================

#[tokio::test]
async fn test_guest_is_unauthorized() {
    let fixture = TestFixture::seeded().await;
    let guest = User::anonymous(0, ["guest"]);

    let err = fixture.service.list(&guest, &CallerQuery::new()).await.unwrap_err();
    assert_eq!(err, CrudError::Unauthorized);
    assert_eq!(
        fixture.service.count(&guest, &CallerQuery::new()).await.unwrap_err(),
        CrudError::Unauthorized
    );
}

#[tokio::test]
async fn test_reader_sees_published_only() {
    let fixture = TestFixture::seeded().await;
    let reader = User::new(1, ["reader"]);

    let found = fixture.service.list(&reader, &CallerQuery::new()).await.unwrap();
    assert_eq!(titles(&found), ["mine-live", "other-live"]);
    assert_eq!(fixture.service.count(&reader, &CallerQuery::new()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_editor_sees_everything() {
    let fixture = TestFixture::seeded().await;
    let editor = User::new(1, ["editor"]);

    let spec = fixture
        .service
        .query_spec(&editor, &CallerQuery::new())
        .await
        .unwrap();
    assert_eq!(spec.access, FilterPredicate::True);
    assert_eq!(fixture.service.count(&editor, &CallerQuery::new()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_author_sees_own_records_only() {
    let fixture = TestFixture::seeded().await;
    let author = User::new(7, ["author"]);

    let found = fixture.service.list(&author, &CallerQuery::new()).await.unwrap();
    assert_eq!(titles(&found), ["mine-draft", "mine-live"]);
}

#[tokio::test]
async fn test_reviewer_sees_own_drafts_and_all_published() {
    let fixture = TestFixture::seeded().await;
    let reviewer = User::new(7, ["reviewer"]);

    let found = fixture.service.list(&reviewer, &CallerQuery::new()).await.unwrap();
    assert_eq!(titles(&found), ["mine-draft", "mine-live", "other-live"]);
}

#[tokio::test]
async fn test_caller_filters_narrow_the_access_filter() {
    let fixture = TestFixture::seeded().await;
    let editor = User::new(1, ["editor"]);

    let q = query(json!({ "authorId": 8, "limit": 10, "page": 0, "orderBy": "title", "order": "desc" }));
    let found = fixture.service.list(&editor, &q).await.unwrap();
    assert_eq!(
        found
            .iter()
            .map(|e| e.fields["title"].as_str().unwrap())
            .collect::<Vec<_>>(),
        ["other-live", "other-draft"]
    );

    let q = query(json!({ "title": ["mine-draft", "other-live", "missing"] }));
    let found = fixture.service.list(&editor, &q).await.unwrap();
    assert_eq!(titles(&found), ["mine-draft", "other-live"]);

    // filters can't widen what the author is allowed to see
    let author = User::new(7, ["author"]);
    let q = query(json!({ "authorId": 8 }));
    assert!(fixture.service.list(&author, &q).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pagination() {
    let fixture = TestFixture::seeded().await;
    let editor = User::new(1, ["editor"]);

    let q = query(json!({ "limit": 3, "page": 1, "orderBy": "id", "order": "asc" }));
    let page = fixture.service.list(&editor, &q).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, Some(4));

    // count ignores paging
    assert_eq!(fixture.service.count(&editor, &q).await.unwrap(), 4);

    let q = query(json!({ "limit": 150 }));
    let spec = fixture.service.query_spec(&editor, &q).await.unwrap();
    assert_eq!(spec.limit, 100);
}

#[tokio::test]
async fn test_custom_query_config() {
    let fixture = TestFixture::seeded().await;
    let service = fixture
        .service
        .clone()
        .with_config(QueryConfig::default().with_default_limit(2).with_max_limit(3));
    let editor = User::new(1, ["editor"]);

    assert_eq!(service.list(&editor, &CallerQuery::new()).await.unwrap().len(), 2);
    assert_eq!(
        service.list(&editor, &query(json!({ "limit": 50 }))).await.unwrap().len(),
        3
    );
}

#[tokio::test]
async fn test_unrestricted_listing_skips_permissions() {
    let fixture = TestFixture::seeded().await;

    let found = fixture
        .service
        .list_unrestricted(&query(json!({ "isPublished": false })))
        .await
        .unwrap();
    assert_eq!(titles(&found), ["mine-draft", "other-draft"]);
    assert_eq!(
        fixture.service.count_unrestricted(&CallerQuery::new()).await.unwrap(),
        4
    );
}

#[tokio::test]
async fn test_nested_owner_fields() {
    let resource = ResourceDescriptor::shared("task", ["assignee.id", "project.owner.id"]);
    let fixture = TestFixture::with_resource(resource).await;
    for (assignee, owner, title) in [(7, 1, "assigned"), (2, 7, "owned-project"), (2, 3, "foreign")] {
        fixture
            .store
            .save(
                ContentEntity::new()
                    .with_field("title", json!(title))
                    .with_field("assignee", json!({ "id": assignee }))
                    .with_field("project", json!({ "owner": { "id": owner } })),
            )
            .await
            .unwrap();
    }

    let author = User::new(7, ["author"]);
    let spec = fixture
        .service
        .query_spec(&author, &CallerQuery::new())
        .await
        .unwrap();
    let joins: Vec<&str> = spec.joins.iter().map(|j| j.path.as_str()).collect();
    assert_eq!(joins, ["assignee", "project", "project.owner"]);

    let found = fixture.service.list(&author, &CallerQuery::new()).await.unwrap();
    assert_eq!(titles(&found), ["assigned", "owned-project"]);
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_by_authorized_user_stamps_author() {
    let fixture = TestFixture::new().await;
    let user = User::new(7, ["author"]);

    let created = fixture
        .service
        .create(&user, ContentEntity::new().with_field("title", json!("x")))
        .await
        .unwrap();

    assert!(created.id.is_some());
    assert_eq!(created.author_id, Some(7));
    assert_eq!(created.moderator_id, Some(7));
    assert!(created.created_at.is_some());
    assert_eq!(fixture.store.len().await, 1);
}

#[tokio::test]
async fn test_create_by_anonymous_user_clears_author() {
    let fixture = TestFixture::new().await;
    let guest = User::anonymous(42, ["guest"]);
    let submitted = ContentEntity {
        author_id: Some(99),
        moderator_id: Some(99),
        ..ContentEntity::default()
    };

    let created = fixture.service.create(&guest, submitted).await.unwrap();
    assert_eq!(created.author_id, None);
    assert_eq!(created.moderator_id, None);

    let value = serde_json::to_value(&created).unwrap();
    assert_eq!(value["authorId"], Value::Null);
    assert_eq!(value["moderatorId"], Value::Null);
}

#[tokio::test]
async fn test_create_ignores_client_id() {
    let fixture = TestFixture::seeded().await;
    let user = User::new(7, ["author"]);
    let hijack = ContentEntity {
        id: Some(3),
        ..ContentEntity::default()
    };

    let created = fixture.service.create(&user, hijack).await.unwrap();
    assert_eq!(created.id, Some(5));
    let untouched = fixture.store.find_by_id(3).await.unwrap().unwrap();
    assert_eq!(untouched.author_id, Some(8));
}

#[tokio::test]
async fn test_create_duplicate_is_conflict() {
    let fixture = TestFixture::new().await;
    let user = User::new(7, ["author"]);
    let article = || ContentEntity::new().with_field("slug", json!("hello-world"));

    fixture.service.create(&user, article()).await.unwrap();
    let err = fixture.service.create(&user, article()).await.unwrap_err();

    assert_eq!(err, CrudError::conflict());
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn test_create_backend_failure_is_generic() {
    let service = failing_service();
    let err = service
        .create(&User::new(7, ["author"]), ContentEntity::new())
        .await
        .unwrap_err();

    assert_eq!(err, CrudError::unprocessable());
    assert!(!err.to_string().contains("disk full"));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_preserves_identity_and_sets_moderator() {
    let fixture = TestFixture::new().await;
    let current = fixture
        .store
        .save(ContentEntity {
            id: Some(5),
            author_id: Some(3),
            moderator_id: Some(3),
            ..ContentEntity::default()
        })
        .await
        .unwrap();

    let mut submitted = Map::new();
    submitted.insert("title".to_string(), json!("x"));
    submitted.insert("id".to_string(), json!(6));
    submitted.insert("authorId".to_string(), json!(9));

    let editor = User::new(9, ["editor"]);
    let updated = fixture
        .service
        .update(&editor, current, &submitted)
        .await
        .unwrap();

    assert_eq!(updated.id, Some(5));
    assert_eq!(updated.author_id, Some(3));
    assert_eq!(updated.moderator_id, Some(9));
    assert_eq!(updated.fields.get("title"), Some(&json!("x")));

    let persisted = fixture.store.find_by_id(5).await.unwrap().unwrap();
    assert_eq!(persisted, updated);
    assert!(fixture.store.find_by_id(6).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_rejects_malformed_payload() {
    let fixture = TestFixture::seeded().await;
    let current = fixture.store.find_by_id(1).await.unwrap().unwrap();
    let mut submitted = Map::new();
    submitted.insert("isPublished".to_string(), json!("soon"));

    let err = fixture
        .service
        .update(&User::new(7, ["author"]), current, &submitted)
        .await
        .unwrap_err();
    assert!(matches!(err, CrudError::UnprocessableEntity(_)));
}

#[tokio::test]
async fn test_update_swallows_persistence_failure() {
    let service = failing_service();
    let current = ContentEntity {
        id: Some(5),
        author_id: Some(3),
        ..ContentEntity::default()
    };
    let mut submitted = Map::new();
    submitted.insert("title".to_string(), json!("x"));

    let result = service
        .update(&User::new(9, ["editor"]), current, &submitted)
        .await
        .unwrap();
    assert_eq!(result.moderator_id, Some(9));
}

// ============================================================================
// Delete / read-one
// ============================================================================

#[tokio::test]
async fn test_delete_returns_removed_entity() {
    let fixture = TestFixture::seeded().await;
    let entity = fixture.store.find_by_id(2).await.unwrap().unwrap();

    let removed = fixture.service.delete(entity.clone()).await.unwrap();
    assert_eq!(removed, entity);
    assert_eq!(fixture.store.len().await, 3);
    assert_eq!(fixture.service.delete(entity).await.unwrap_err(), CrudError::NotFound);
}

#[tokio::test]
async fn test_read_one_passes_entity_through() {
    let fixture = TestFixture::seeded().await;
    let entity = fixture.store.find_by_id(1).await.unwrap().unwrap();
    assert_eq!(fixture.service.read_one(entity.clone()), entity);
}

// ============================================================================
// Guards
// ============================================================================

#[tokio::test]
async fn test_guard_load_not_found() {
    let fixture = TestFixture::seeded().await;
    assert_eq!(
        fixture.service.guard().load(99).await.unwrap_err(),
        CrudError::NotFound
    );
}

#[tokio::test]
async fn test_guard_visibility() {
    let fixture = TestFixture::seeded().await;
    let guard = fixture.service.guard();

    let reader = User::new(1, ["reader"]);
    assert!(guard.load_visible(&reader, 2).await.is_ok());
    assert_eq!(guard.load_visible(&reader, 1).await.unwrap_err(), CrudError::NotFound);

    let editor = User::new(1, ["editor"]);
    assert!(guard.load_visible(&editor, 1).await.is_ok());

    let author = User::new(7, ["author"]);
    assert!(guard.load_visible(&author, 1).await.is_ok());
    assert_eq!(guard.load_visible(&author, 4).await.unwrap_err(), CrudError::NotFound);

    let guest = User::anonymous(0, ["guest"]);
    assert_eq!(guard.load_visible(&guest, 2).await.unwrap_err(), CrudError::Unauthorized);
}

#[tokio::test]
async fn test_guard_ownership() {
    let fixture = TestFixture::seeded().await;
    let guard = fixture.service.guard();

    let author = User::new(7, ["author"]);
    assert!(guard.load_for(&author, 1, PermissionKey::Edit).await.is_ok());
    assert!(guard.load_for(&author, 2, PermissionKey::Remove).await.is_ok());
    assert_eq!(
        guard.load_for(&author, 3, PermissionKey::Edit).await.unwrap_err(),
        CrudError::Forbidden
    );

    let editor = User::new(1, ["editor"]);
    assert!(guard.load_for(&editor, 3, PermissionKey::Remove).await.is_ok());

    let reader = User::new(8, ["reader"]);
    assert_eq!(
        guard.load_for(&reader, 3, PermissionKey::Edit).await.unwrap_err(),
        CrudError::Forbidden
    );
}

#[tokio::test]
async fn test_guard_add() {
    let fixture = TestFixture::new().await;
    let guard = fixture.service.guard();

    assert!(guard.ensure_can_add(&User::new(7, ["author"])).await.is_ok());
    assert_eq!(
        guard.ensure_can_add(&User::new(1, ["reader"])).await.unwrap_err(),
        CrudError::Forbidden
    );
}

#[tokio::test]
async fn test_guard_view_keys_follow_visibility() {
    let fixture = TestFixture::seeded().await;
    let guard = fixture.service.guard();

    let author = User::new(7, ["author"]);
    assert!(guard.load_for(&author, 1, PermissionKey::ViewAll).await.is_ok());
    assert_eq!(
        guard.load_for(&author, 4, PermissionKey::ViewAll).await.unwrap_err(),
        CrudError::NotFound
    );

    let reader = User::new(1, ["reader"]);
    assert!(guard.load_for(&reader, 2, PermissionKey::ViewOwn).await.is_ok());
    assert_eq!(
        guard.load_for(&reader, 1, PermissionKey::ViewUnpublished).await.unwrap_err(),
        CrudError::NotFound
    );
}

#[tokio::test]
async fn test_guard_owner_scoped_keys_need_ownership() {
    let fixture = TestFixture::seeded().await;
    let guard = fixture.service.guard();

    let author = User::new(7, ["author"]);
    assert!(guard.load_for(&author, 1, PermissionKey::EditOwn).await.is_ok());
    assert_eq!(
        guard.load_for(&author, 3, PermissionKey::RemoveOwn).await.unwrap_err(),
        CrudError::Forbidden
    );

    // edit does not imply edit_own
    let editor = User::new(8, ["editor"]);
    assert_eq!(
        guard.load_for(&editor, 3, PermissionKey::EditOwn).await.unwrap_err(),
        CrudError::Forbidden
    );
}

#[tokio::test]
async fn test_view_own_without_owner_fields_is_unauthorized() {
    let resource = ResourceDescriptor::shared("page", std::iter::empty::<&str>());
    let fixture = TestFixture::with_resource(resource).await;
    fixture.seed(Some(7), true, "about").await;
    let author = User::new(7, ["author"]);

    assert_eq!(
        fixture.service.list(&author, &CallerQuery::new()).await.unwrap_err(),
        CrudError::Unauthorized
    );
    assert_eq!(
        fixture.service.guard().load_visible(&author, 1).await.unwrap_err(),
        CrudError::Unauthorized
    );
}

// ============================================================================
// Failing store
// ============================================================================

/// Store whose writes always fail with a backend error.
struct FailingStore;

#[async_trait]
impl PersistenceStore for FailingStore {
    async fn find(&self, _spec: &QuerySpec) -> StoreResult<Vec<ContentEntity>> {
        Ok(Vec::new())
    }

    async fn count(&self, _spec: &QuerySpec) -> StoreResult<u64> {
        Ok(0)
    }

    async fn find_by_id(&self, _id: EntityId) -> StoreResult<Option<ContentEntity>> {
        Ok(None)
    }

    async fn save(&self, _entity: ContentEntity) -> StoreResult<ContentEntity> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    async fn remove(&self, _entity: &ContentEntity) -> StoreResult<ContentEntity> {
        Err(StoreError::Backend("disk full".to_string()))
    }
}

fn failing_service() -> ContentService {
    ContentService::new(
        ResourceDescriptor::shared("article", ["authorId"]),
        Arc::new(MemoryPermissionStore::new()),
        Arc::new(FailingStore),
    )
}

#[tokio::test]
async fn test_delete_backend_failure_is_generic() {
    let err = failing_service()
        .delete(ContentEntity {
            id: Some(1),
            ..ContentEntity::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, CrudError::unprocessable());
}
