//! # Permission Keys
//!
//! The abstract permission vocabulary shared by every content resource.
//! A key only becomes a grantable permission once it is namespaced with a
//! resource name (see [`crate::permissions::Permission`]).

use serde::{Deserialize, Serialize};

/// Abstract permissions that can be granted on a content resource.
///
/// Keys come in two flavours:
/// - **Unscoped**: `ViewAll`, `Edit`, `Remove` apply to every record
/// - **Owner-scoped**: `ViewOwn`, `EditOwn`, `RemoveOwn` apply only to records
///   whose owner fields equal the acting user's id
///
/// `ViewUnpublished` widens `ViewAll` to records that are not published yet,
/// and `Add` allows creating new records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    /// View every published record.
    ViewAll,

    /// View records owned by the acting user.
    ViewOwn,

    /// View records that are not published.
    ///
    /// Only meaningful together with `ViewAll`.
    ViewUnpublished,

    /// Create new records.
    Add,

    /// Edit any record.
    Edit,

    /// Edit records owned by the acting user.
    EditOwn,

    /// Remove any record.
    Remove,

    /// Remove records owned by the acting user.
    RemoveOwn,
}

impl PermissionKey {
    /// Get the string representation of the key.
    ///
    /// # Returns
    ///
    /// A static string used when namespacing the key with a resource name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKey::ViewAll => "view_all",
            PermissionKey::ViewOwn => "view_own",
            PermissionKey::ViewUnpublished => "view_unpublished",
            PermissionKey::Add => "add",
            PermissionKey::Edit => "edit",
            PermissionKey::EditOwn => "edit_own",
            PermissionKey::Remove => "remove",
            PermissionKey::RemoveOwn => "remove_own",
        }
    }

    /// Parse a key from its string representation.
    ///
    /// Parsing is case-insensitive and accepts `-` as well as `_` as the word
    /// separator.
    ///
    /// # Example
    ///
    /// ```
    /// use content_rbac::keys::PermissionKey;
    ///
    /// assert_eq!(PermissionKey::parse("view_all"), Some(PermissionKey::ViewAll));
    /// assert_eq!(PermissionKey::parse("Edit-Own"), Some(PermissionKey::EditOwn));
    /// assert_eq!(PermissionKey::parse("publish"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "view_all" => Some(PermissionKey::ViewAll),
            "view_own" => Some(PermissionKey::ViewOwn),
            "view_unpublished" => Some(PermissionKey::ViewUnpublished),
            "add" => Some(PermissionKey::Add),
            "edit" => Some(PermissionKey::Edit),
            "edit_own" => Some(PermissionKey::EditOwn),
            "remove" => Some(PermissionKey::Remove),
            "remove_own" => Some(PermissionKey::RemoveOwn),
            _ => None,
        }
    }

    /// Get all keys.
    pub fn all() -> Vec<Self> {
        vec![
            PermissionKey::ViewAll,
            PermissionKey::ViewOwn,
            PermissionKey::ViewUnpublished,
            PermissionKey::Add,
            PermissionKey::Edit,
            PermissionKey::EditOwn,
            PermissionKey::Remove,
            PermissionKey::RemoveOwn,
        ]
    }

    /// Get the owner-scoped counterpart of an unscoped key.
    ///
    /// # Example
    ///
    /// ```
    /// use content_rbac::keys::PermissionKey;
    ///
    /// assert_eq!(PermissionKey::Edit.own_variant(), Some(PermissionKey::EditOwn));
    /// assert_eq!(PermissionKey::Add.own_variant(), None);
    /// ```
    pub fn own_variant(&self) -> Option<Self> {
        match self {
            PermissionKey::ViewAll => Some(PermissionKey::ViewOwn),
            PermissionKey::Edit => Some(PermissionKey::EditOwn),
            PermissionKey::Remove => Some(PermissionKey::RemoveOwn),
            _ => None,
        }
    }

    /// Check if this key only applies to records owned by the acting user.
    pub fn is_owner_scoped(&self) -> bool {
        matches!(
            self,
            PermissionKey::ViewOwn | PermissionKey::EditOwn | PermissionKey::RemoveOwn
        )
    }

    /// Check if this key grants read access of some kind.
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            PermissionKey::ViewAll | PermissionKey::ViewOwn | PermissionKey::ViewUnpublished
        )
    }
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
