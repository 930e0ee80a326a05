//! Software inventory service.

use chrono::Utc;
use tracing::debug;

use crate::error::{LicensingError, Result};
use crate::model::audit::snapshot;
use crate::model::{AuditAction, NewAuditEntry, RecordSoftwareVersionInput, SoftwareVersion};
use crate::policy::{self, Action};
use crate::store::EntityStore;
use crate::types::{Actor, DeviceId, EntityKind, SoftwareVersionId};

/// Service for tracking software observed on devices.
pub struct SoftwareService {
    store: EntityStore,
}

impl SoftwareService {
    /// Create a new software service.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Record a software version observation for a device.
    pub async fn record(
        &self,
        input: RecordSoftwareVersionInput,
        actor: Actor,
    ) -> Result<SoftwareVersion> {
        policy::require(actor.role, Action::Create, EntityKind::SoftwareVersion)?;

        if input.product.trim().is_empty() || input.version.trim().is_empty() {
            return Err(LicensingError::Validation(
                "software product and version must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let version = SoftwareVersion {
            id: SoftwareVersionId::new(),
            device_id: input.device_id,
            product: input.product,
            version: input.version,
            detected_at: input.detected_at.unwrap_or(now),
        };

        let mut tx = self.store.begin().await?;
        if tx.device(&version.device_id).is_none() {
            return Err(LicensingError::not_found(
                EntityKind::Device,
                &version.device_id,
            ));
        }

        let after = snapshot(&version)?;
        tx.insert_software_version(version.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Create,
            entity_type: EntityKind::SoftwareVersion,
            entity_id: version.id.to_string(),
            timestamp: now,
            before: None,
            after: Some(after),
        });
        tx.commit();

        debug!(
            device_id = %version.device_id,
            product = %version.product,
            "software version recorded"
        );
        Ok(version)
    }

    /// Remove a software record.
    pub async fn remove(&self, id: &SoftwareVersionId, actor: Actor) -> Result<()> {
        policy::require(actor.role, Action::Delete, EntityKind::SoftwareVersion)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .software_version(id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::SoftwareVersion, id))?;

        let before = snapshot(&current)?;
        tx.remove_software_version(id);
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Delete,
            entity_type: EntityKind::SoftwareVersion,
            entity_id: id.to_string(),
            timestamp: Utc::now(),
            before: Some(before),
            after: None,
        });
        tx.commit();
        Ok(())
    }

    /// Software records for a device, most recently detected first.
    pub async fn list_for_device(&self, device_id: &DeviceId) -> Result<Vec<SoftwareVersion>> {
        if self.store.get_device(device_id).await?.is_none() {
            return Err(LicensingError::not_found(EntityKind::Device, device_id));
        }
        self.store.list_software_for_device(device_id).await
    }
}
