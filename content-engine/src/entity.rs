//! Content entities.
//!
//! Every content resource shares the same envelope (id, author, moderator,
//! publication flag, timestamps) and carries its own fields alongside.
//! Relations are embedded as nested objects, so owner field paths such as
//! `project.owner.id` resolve by walking into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::user::UserId;

/// Entity identifier.
pub type EntityId = i64;

/// Envelope fields a submitted update can never overwrite.
pub const PROTECTED_FIELDS: [&str; 5] = ["id", "authorId", "moderatorId", "createdAt", "updatedAt"];

/// A record of some content resource.
///
/// # Examples
///
/// ```
/// use content_engine::ContentEntity;
/// use serde_json::json;
///
/// let entity = ContentEntity::new()
///     .with_field("title", json!("Hello"))
///     .with_field("project", json!({ "owner": { "id": 7 } }));
///
/// assert_eq!(entity.value_at("title"), Some(json!("Hello")));
/// assert_eq!(entity.value_at("project.owner.id"), Some(json!(7)));
/// assert_eq!(entity.value_at("isPublished"), Some(json!(false)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntity {
    /// Entity ID, `None` until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    /// Author, `None` for anonymous submissions
    #[serde(default)]
    pub author_id: Option<UserId>,

    /// User who last created or modified the entity
    #[serde(default)]
    pub moderator_id: Option<UserId>,

    /// Whether the entity is visible to users without `view_unpublished`
    #[serde(default)]
    pub is_published: bool,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Resource-specific fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentEntity {
    /// Create an empty, unpublished entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a resource-specific field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Set the publication flag.
    #[must_use]
    pub fn published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }

    /// Look up a value by dot path.
    ///
    /// Envelope fields are addressed by their serialized names (`authorId`,
    /// `isPublished`, ...). Missing paths yield `None`.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let root = match segments.next()? {
            "id" => Value::from(self.id?),
            "authorId" => self.author_id.map_or(Value::Null, Value::from),
            "moderatorId" => self.moderator_id.map_or(Value::Null, Value::from),
            "isPublished" => Value::Bool(self.is_published),
            "createdAt" => Value::String(self.created_at?.to_rfc3339()),
            "updatedAt" => Value::String(self.updated_at?.to_rfc3339()),
            name => self.fields.get(name)?.clone(),
        };

        let mut current = &root;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Check if any owner field equals the user's id.
    pub fn is_owned_by(&self, owner_fields: &[String], user_id: UserId) -> bool {
        let user = Value::from(user_id);
        owner_fields
            .iter()
            .any(|field| self.value_at(field).as_ref() == Some(&user))
    }

    /// Overlay submitted values onto a copy of this entity.
    ///
    /// Submitted values win, except for [`PROTECTED_FIELDS`] which are
    /// ignored. Fails when a submitted value has the wrong shape for an
    /// envelope field (e.g. a string for `isPublished`).
    pub fn overlay(&self, submitted: &Map<String, Value>) -> serde_json::Result<Self> {
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in submitted {
            if PROTECTED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(merged))
    }
}
