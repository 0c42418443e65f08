//! Permission-to-predicate compilation.
//!
//! Turns an [`AccessScope`] and a resource's owner fields into the filter a
//! query must carry so that only records the user may see are returned.
//!
//! | view_all | view_unpublished | view_own | predicate                                   |
//! |----------|------------------|----------|---------------------------------------------|
//! | no       | any              | no       | denied                                      |
//! | yes      | yes              | any      | unrestricted                                |
//! | yes      | no               | no       | `isPublished = true`                        |
//! | yes      | no               | yes      | `(owner_1 = u OR ...) OR isPublished = true` |
//! | no       | any              | yes      | `(owner_1 = u OR ...)`                      |

use content_rbac::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::entity::ContentEntity;
use crate::scope::AccessScope;
use crate::user::UserId;

/// Field holding the publication flag.
pub const PUBLISHED_FIELD: &str = "isPublished";

/// Comparison applied by a [`FilterTerm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Field equals the value
    Eq,
    /// Field equals one of the values (the value is an array)
    In,
}

/// A single `field <op> value` comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTerm {
    /// Dot path of the compared field
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Compared value
    pub value: Value,
}

impl FilterTerm {
    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// `field IN (values)`
    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        }
    }

    /// Evaluate the comparison against an entity.
    ///
    /// A missing field compares as `null`.
    pub fn matches(&self, entity: &ContentEntity) -> bool {
        let actual = entity.value_at(&self.field).unwrap_or(Value::Null);
        match self.op {
            FilterOp::Eq => actual == self.value,
            FilterOp::In => self
                .value
                .as_array()
                .is_some_and(|candidates| candidates.contains(&actual)),
        }
    }
}

/// Boolean filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    /// No restriction
    True,
    /// A single comparison
    Term(FilterTerm),
    /// Every child holds (an empty group holds)
    And(Vec<FilterPredicate>),
    /// At least one child holds (an empty group does not)
    Or(Vec<FilterPredicate>),
}

impl FilterPredicate {
    /// Check if this predicate restricts nothing.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, FilterPredicate::True)
    }

    /// Conjunction of two predicates, dropping unrestricted sides.
    #[must_use]
    pub fn and(self, other: FilterPredicate) -> FilterPredicate {
        match (self, other) {
            (FilterPredicate::True, p) | (p, FilterPredicate::True) => p,
            (FilterPredicate::And(mut left), FilterPredicate::And(right)) => {
                left.extend(right);
                FilterPredicate::And(left)
            }
            (FilterPredicate::And(mut left), p) => {
                left.push(p);
                FilterPredicate::And(left)
            }
            (p, q) => FilterPredicate::And(vec![p, q]),
        }
    }

    /// Evaluate the predicate against an entity.
    pub fn matches(&self, entity: &ContentEntity) -> bool {
        match self {
            FilterPredicate::True => true,
            FilterPredicate::Term(term) => term.matches(entity),
            FilterPredicate::And(children) => children.iter().all(|c| c.matches(entity)),
            FilterPredicate::Or(children) => children.iter().any(|c| c.matches(entity)),
        }
    }

    /// Count the comparison leaves in the tree.
    pub fn term_count(&self) -> usize {
        match self {
            FilterPredicate::True => 0,
            FilterPredicate::Term(_) => 1,
            FilterPredicate::And(children) | FilterPredicate::Or(children) => {
                children.iter().map(FilterPredicate::term_count).sum()
            }
        }
    }
}

/// A relation join required to reach a nested owner field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    /// Accumulated path of the joined relation (also its alias)
    pub path: String,
    /// Path of the relation it is joined from, `None` for the root entity
    pub parent: Option<String>,
    /// Relation name on the parent
    pub relation: String,
}

/// Derive the joins needed to reach each field path.
///
/// Every segment but the last becomes a join keyed by its accumulated path;
/// fields sharing a prefix reuse the same join.
///
/// # Example
///
/// ```
/// use content_engine::predicate::derive_joins;
///
/// let joins = derive_joins(&["project.owner.id".to_string(), "project.lead.id".to_string()]);
/// let paths: Vec<_> = joins.iter().map(|j| j.path.as_str()).collect();
/// assert_eq!(paths, ["project", "project.owner", "project.lead"]);
/// ```
pub fn derive_joins(fields: &[String]) -> Vec<Join> {
    let mut seen = HashSet::new();
    let mut joins = Vec::new();

    for field in fields {
        let segments: Vec<&str> = field.split('.').collect();
        let Some((_, relations)) = segments.split_last() else {
            continue;
        };

        let mut parent: Option<String> = None;
        for relation in relations {
            let path = match &parent {
                Some(p) => format!("{p}.{relation}"),
                None => (*relation).to_string(),
            };
            if seen.insert(path.clone()) {
                joins.push(Join {
                    path: path.clone(),
                    parent: parent.clone(),
                    relation: (*relation).to_string(),
                });
            }
            parent = Some(path);
        }
    }

    joins
}

/// Outcome of compiling an access scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPredicate {
    /// The user may not see any record
    Denied,
    /// The user may see records matching the predicate
    Granted {
        /// Filter every query must carry
        predicate: FilterPredicate,
        /// Joins the predicate relies on
        joins: Vec<Join>,
    },
}

impl AccessPredicate {
    /// Check if the scope was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessPredicate::Denied)
    }
}

/// Compile a scope into an access predicate.
///
/// See the module documentation for the branch table. Owner terms are always
/// grouped under one `Or`, one equality per owner field.
pub fn compile(scope: &AccessScope, owner_fields: &[String], user_id: UserId) -> AccessPredicate {
    if !scope.can_view_any() {
        return AccessPredicate::Denied;
    }

    let mut published_only = false;
    let mut owner_restricted = false;
    if scope.view_all {
        if !scope.view_unpublished {
            published_only = true;
            owner_restricted = scope.view_own;
        }
    } else {
        owner_restricted = true;
    }

    let owner_terms: Vec<FilterPredicate> = if owner_restricted {
        owner_fields
            .iter()
            .map(|field| FilterPredicate::Term(FilterTerm::eq(field.as_str(), user_id)))
            .collect()
    } else {
        Vec::new()
    };
    let has_owner_restriction = !owner_terms.is_empty();

    // view_own without owner fields would otherwise compile to "everything"
    if owner_restricted && !has_owner_restriction && !scope.view_all {
        tracing::warn!("view_own granted on a resource without owner fields, denying");
        return AccessPredicate::Denied;
    }

    let published = || FilterPredicate::Term(FilterTerm::eq(PUBLISHED_FIELD, true));
    let predicate = match (has_owner_restriction, published_only) {
        (true, true) => FilterPredicate::Or(vec![FilterPredicate::Or(owner_terms), published()]),
        (true, false) => FilterPredicate::Or(owner_terms),
        (false, true) => published(),
        (false, false) => FilterPredicate::True,
    };

    let joins = if has_owner_restriction {
        derive_joins(owner_fields)
    } else {
        Vec::new()
    };

    AccessPredicate::Granted { predicate, joins }
}

/// Compiles access predicates for one resource.
#[derive(Debug, Clone, Copy)]
pub struct PredicateCompiler<'a> {
    resource: &'a ResourceDescriptor,
}

impl<'a> PredicateCompiler<'a> {
    /// Create a compiler for a resource.
    pub fn new(resource: &'a ResourceDescriptor) -> Self {
        Self { resource }
    }

    /// Compile a user's scope against the resource's owner fields.
    pub fn compile(&self, scope: &AccessScope, user_id: UserId) -> AccessPredicate {
        compile(scope, self.resource.owner_fields(), user_id)
    }
}
