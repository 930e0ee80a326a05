//! Device service.

use std::net::IpAddr;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{LicensingError, Result};
use crate::model::audit::snapshot;
use crate::model::{
    AuditAction, CreateDeviceInput, Device, DeviceFilter, NewAuditEntry, UpdateDeviceInput,
};
use crate::policy::{self, Action};
use crate::store::EntityStore;
use crate::types::{Actor, DeviceId, EntityKind, Page};

/// Service for managing network devices.
pub struct DeviceService {
    store: EntityStore,
}

impl DeviceService {
    /// Create a new device service.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Register a device.
    pub async fn create(&self, input: CreateDeviceInput, actor: Actor) -> Result<Device> {
        policy::require(actor.role, Action::Create, EntityKind::Device)?;

        let id = parse_device_id(&input.id)?;
        let ip_address = parse_ip(&input.ip_address)?;
        if input.location.trim().is_empty() {
            return Err(LicensingError::Validation(
                "device location must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let device = Device {
            id: id.clone(),
            kind: input.kind,
            ip_address,
            location: input.location,
            model: input.model,
            status: input.status,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        if tx.device(&id).is_some() {
            return Err(LicensingError::Validation(format!(
                "device {id} already exists"
            )));
        }
        if let Some(existing) = tx.device_by_ip(ip_address) {
            return Err(LicensingError::Validation(format!(
                "IP address {ip_address} is already in use by device {}",
                existing.id
            )));
        }

        let after = snapshot(&device)?;
        tx.insert_device(device.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Create,
            entity_type: EntityKind::Device,
            entity_id: id.to_string(),
            timestamp: now,
            before: None,
            after: Some(after),
        });
        tx.commit();

        info!(device_id = %device.id, kind = %device.kind, "device registered");
        Ok(device)
    }

    /// Update a device.
    pub async fn update(
        &self,
        id: &DeviceId,
        input: UpdateDeviceInput,
        actor: Actor,
    ) -> Result<Device> {
        policy::require(actor.role, Action::Update, EntityKind::Device)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .device(id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::Device, id))?;

        if let Some(expected) = input.expected_updated_at {
            if expected != current.updated_at {
                return Err(LicensingError::conflict(EntityKind::Device, id));
            }
        }

        let mut updated = current.clone();
        if let Some(kind) = input.kind {
            updated.kind = kind;
        }
        if let Some(raw_ip) = input.ip_address {
            let ip = parse_ip(&raw_ip)?;
            if let Some(existing) = tx.device_by_ip(ip) {
                if existing.id != *id {
                    return Err(LicensingError::Validation(format!(
                        "IP address {ip} is already in use by device {}",
                        existing.id
                    )));
                }
            }
            updated.ip_address = ip;
        }
        if let Some(location) = input.location {
            if location.trim().is_empty() {
                return Err(LicensingError::Validation(
                    "device location must not be empty".to_string(),
                ));
            }
            updated.location = location;
        }
        if let Some(model) = input.model {
            updated.model = Some(model);
        }
        if let Some(status) = input.status {
            updated.status = status;
        }
        updated.updated_at = Utc::now();

        let before = snapshot(&current)?;
        let after = snapshot(&updated)?;
        tx.update_device(updated.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Update,
            entity_type: EntityKind::Device,
            entity_id: id.to_string(),
            timestamp: updated.updated_at,
            before: Some(before),
            after: Some(after),
        });
        tx.commit();

        debug!(device_id = %id, "device updated");
        Ok(updated)
    }

    /// Delete a device. Fails while it holds active license assignments;
    /// its software inventory is removed in the same transaction.
    pub async fn delete(&self, id: &DeviceId, actor: Actor) -> Result<()> {
        policy::require(actor.role, Action::Delete, EntityKind::Device)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .device(id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::Device, id))?;

        let active = tx.device_active_assignment_count(id);
        if active > 0 {
            return Err(LicensingError::Validation(format!(
                "device {id} holds {active} active license assignment(s)"
            )));
        }

        for software_id in tx.software_ids_for_device(id) {
            tx.remove_software_version(&software_id);
        }

        let before = snapshot(&current)?;
        tx.remove_device(id);
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Delete,
            entity_type: EntityKind::Device,
            entity_id: id.to_string(),
            timestamp: Utc::now(),
            before: Some(before),
            after: None,
        });
        tx.commit();

        info!(device_id = %id, "device deleted");
        Ok(())
    }

    /// Fetch a device by id.
    pub async fn get(&self, id: &DeviceId) -> Result<Option<Device>> {
        self.store.get_device(id).await
    }

    /// List devices matching a filter.
    pub async fn list(&self, filter: &DeviceFilter, page: Page) -> Result<Vec<Device>> {
        self.store.list_devices(filter, page).await
    }

    /// Count devices matching a filter.
    pub async fn count(&self, filter: &DeviceFilter) -> Result<usize> {
        self.store.count_devices(filter).await
    }
}

fn parse_device_id(raw: &str) -> Result<DeviceId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LicensingError::Validation(
            "device id must not be empty".to_string(),
        ));
    }
    Ok(DeviceId::new(trimmed))
}

fn parse_ip(raw: &str) -> Result<IpAddr> {
    raw.trim()
        .parse()
        .map_err(|_| LicensingError::Validation(format!("invalid IP address: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceType;
    use crate::types::Role;
    use uuid::Uuid;

    fn service() -> (DeviceService, EntityStore) {
        let store = EntityStore::new();
        (DeviceService::new(store.clone()), store)
    }

    fn engineer() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Engineer)
    }

    fn input(id: &str, ip: &str) -> CreateDeviceInput {
        CreateDeviceInput {
            id: id.to_string(),
            kind: DeviceType::Switch,
            ip_address: ip.to_string(),
            location: "DC-1 rack 4".to_string(),
            model: Some("C9300".to_string()),
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn engineer_registers_devices() {
        let (service, store) = service();
        let device = service
            .create(input("SW-CORE-01", "10.0.0.1"), engineer())
            .await
            .unwrap();

        assert_eq!(device.id.as_str(), "SW-CORE-01");
        assert_eq!(store.audit_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn auditor_may_not_register_devices() {
        let (service, store) = service();
        let auditor = Actor::new(Uuid::new_v4(), Role::Auditor);

        let err = service
            .create(input("SW-CORE-01", "10.0.0.1"), auditor)
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Forbidden { .. }));
        assert_eq!(store.audit_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_malformed_ip() {
        let (service, _) = service();
        let err = service
            .create(input("SW-CORE-01", "10.0.0.999"), engineer())
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }

    #[tokio::test]
    async fn accepts_ipv6() {
        let (service, _) = service();
        let device = service
            .create(input("FW-EDGE-01", "2001:db8::1"), engineer())
            .await
            .unwrap();
        assert!(device.ip_address.is_ipv6());
    }

    #[tokio::test]
    async fn duplicate_id_and_ip_are_rejected() {
        let (service, _) = service();
        service
            .create(input("SW-CORE-01", "10.0.0.1"), engineer())
            .await
            .unwrap();

        let err = service
            .create(input("SW-CORE-01", "10.0.0.2"), engineer())
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));

        let err = service
            .create(input("SW-CORE-02", "10.0.0.1"), engineer())
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }

    #[tokio::test]
    async fn update_changes_status_and_audits() {
        let (service, store) = service();
        let device = service
            .create(input("SW-CORE-01", "10.0.0.1"), engineer())
            .await
            .unwrap();

        let updated = service
            .update(
                &device.id,
                UpdateDeviceInput {
                    status: Some(crate::model::DeviceStatus::Inactive),
                    ..Default::default()
                },
                engineer(),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, crate::model::DeviceStatus::Inactive);
        assert_eq!(store.audit_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let (service, _) = service();
        let device = service
            .create(input("SW-CORE-01", "10.0.0.1"), engineer())
            .await
            .unwrap();

        let err = service
            .update(
                &device.id,
                UpdateDeviceInput {
                    location: Some("DC-2".to_string()),
                    expected_updated_at: Some(device.created_at - chrono::Duration::seconds(1)),
                    ..Default::default()
                },
                engineer(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Conflict { .. }));
    }

    #[tokio::test]
    async fn delete_cascades_software_inventory() {
        let (service, store) = service();
        let device = service
            .create(input("SW-CORE-01", "10.0.0.1"), engineer())
            .await
            .unwrap();

        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();
        tx.insert_software_version(crate::model::SoftwareVersion {
            id: crate::types::SoftwareVersionId::new(),
            device_id: device.id.clone(),
            product: "IOS-XE".to_string(),
            version: "17.9.4".to_string(),
            detected_at: now,
        });
        tx.commit();

        service.delete(&device.id, engineer()).await.unwrap();

        assert!(store.get_device(&device.id).await.unwrap().is_none());
        assert!(store
            .list_software_for_device(&device.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_location_and_status() {
        let (service, _) = service();
        service
            .create(input("SW-CORE-01", "10.0.0.1"), engineer())
            .await
            .unwrap();
        let mut other = input("FW-EDGE-01", "10.0.0.2");
        other.location = "Branch-7".to_string();
        other.kind = DeviceType::Firewall;
        service.create(other, engineer()).await.unwrap();

        let filter = DeviceFilter {
            location_contains: Some("dc-1".to_string()),
            ..Default::default()
        };
        let matches = service.list(&filter, Page::default()).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id.as_str(), "SW-CORE-01");

        let filter = DeviceFilter {
            kind: Some(DeviceType::Firewall),
            ..Default::default()
        };
        assert_eq!(service.count(&filter).await.unwrap(), 1);
    }
}
