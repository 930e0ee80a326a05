//! Audit trail read service.
//!
//! The write side lives inside store transactions — every mutation appends
//! its entry in the same atomic unit. This service only queries; there is
//! no API for changing or removing what was recorded.

use uuid::Uuid;

use crate::error::Result;
use crate::model::{AuditAction, AuditEntry, AuditFilter};
use crate::store::EntityStore;
use crate::types::EntityKind;

/// Read access to the audit trail.
pub struct AuditService {
    store: EntityStore,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Query the trail, newest first; entries sharing a timestamp keep
    /// their commit order.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.store.query_audit(filter).await
    }

    /// All entries describing one entity, newest first.
    pub async fn for_entity(
        &self,
        entity_type: EntityKind,
        entity_id: impl Into<String>,
    ) -> Result<Vec<AuditEntry>> {
        self.query(&AuditFilter {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id.into()),
            ..Default::default()
        })
        .await
    }

    /// All entries recorded for one actor, newest first.
    pub async fn for_actor(&self, actor: Uuid) -> Result<Vec<AuditEntry>> {
        self.query(&AuditFilter {
            actor: Some(actor),
            ..Default::default()
        })
        .await
    }

    /// All entries for one action kind, newest first.
    pub async fn for_action(&self, action: AuditAction) -> Result<Vec<AuditEntry>> {
        self.query(&AuditFilter {
            action: Some(action),
            ..Default::default()
        })
        .await
    }
}
