//! Audit trail model.
//!
//! Entries are append-only and immutable: the store exposes no update or
//! delete path for them, and the append happens inside the same
//! transaction as the mutation it describes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{AuditEntryId, EntityKind, Page};

/// Action recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Assign,
    Revoke,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Assign => write!(f, "assign"),
            Self::Revoke => write!(f, "revoke"),
        }
    }
}

/// An immutable record of one state-changing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier.
    pub id: AuditEntryId,
    /// Monotonic append sequence; preserves commit order even for entries
    /// sharing a timestamp.
    pub seq: u64,
    /// Identity of the actor who performed the action.
    pub actor: Uuid,
    /// What was done.
    pub action: AuditAction,
    /// Kind of the mutated entity.
    pub entity_type: EntityKind,
    /// Identifier of the mutated entity, kept as a loose string so the
    /// entry survives deletion of the entity it describes.
    pub entity_id: String,
    /// When the mutation committed.
    pub timestamp: DateTime<Utc>,
    /// Entity state before the mutation, where one existed.
    pub before: Option<serde_json::Value>,
    /// Entity state after the mutation, where one remains.
    pub after: Option<serde_json::Value>,
}

/// Input for appending an audit entry inside a store transaction.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Identity of the acting user.
    pub actor: Uuid,
    /// What was done.
    pub action: AuditAction,
    /// Kind of the mutated entity.
    pub entity_type: EntityKind,
    /// Identifier of the mutated entity.
    pub entity_id: String,
    /// Mutation timestamp, shared with the mutation itself.
    pub timestamp: DateTime<Utc>,
    /// Entity state before the mutation.
    pub before: Option<serde_json::Value>,
    /// Entity state after the mutation.
    pub after: Option<serde_json::Value>,
}

/// Serialize an entity into an audit snapshot.
///
/// Failure aborts the enclosing transaction: a mutation must not commit
/// without its audit entry.
pub fn snapshot<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Filter for querying the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by mutated entity kind.
    pub entity_type: Option<EntityKind>,
    /// Filter by mutated entity identifier.
    pub entity_id: Option<String>,
    /// Filter by action.
    pub action: Option<AuditAction>,
    /// Filter by acting user.
    pub actor: Option<Uuid>,
    /// Entries at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Entries at or before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Pagination.
    pub page: Page,
}

impl AuditFilter {
    /// Whether an entry passes this filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_type.is_none_or(|t| entry.entity_type == t)
            && self
                .entity_id
                .as_ref()
                .is_none_or(|id| &entry.entity_id == id)
            && self.action.is_none_or(|a| entry.action == a)
            && self.actor.is_none_or(|a| entry.actor == a)
            && self.from.is_none_or(|from| entry.timestamp >= from)
            && self.to.is_none_or(|to| entry.timestamp <= to)
    }
}
