//! License service.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{LicensingError, Result};
use crate::model::audit::snapshot;
use crate::model::{
    AuditAction, CreateLicenseInput, License, LicenseFilter, NewAuditEntry, UpdateLicenseInput,
};
use crate::policy::{self, Action};
use crate::store::EntityStore;
use crate::types::{Actor, EntityKind, LicenseId, Page};

/// Service for managing licenses.
pub struct LicenseService {
    store: EntityStore,
}

impl LicenseService {
    /// Create a new license service.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Register a purchased license.
    pub async fn create(&self, input: CreateLicenseInput, actor: Actor) -> Result<License> {
        policy::require(actor.role, Action::Create, EntityKind::License)?;

        let key = input.key.trim().to_string();
        if key.is_empty() {
            return Err(LicensingError::Validation(
                "license key must not be empty".to_string(),
            ));
        }
        if input.product.trim().is_empty() {
            return Err(LicensingError::Validation(
                "license product must not be empty".to_string(),
            ));
        }
        validate_seats(input.total_seats)?;
        validate_window(input.valid_from, input.valid_until)?;

        let now = Utc::now();
        let license = License {
            id: LicenseId::new(),
            key,
            product: input.product,
            vendor_id: input.vendor_id,
            total_seats: input.total_seats,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        if tx.vendor(&license.vendor_id).is_none() {
            return Err(LicensingError::not_found(
                EntityKind::Vendor,
                license.vendor_id,
            ));
        }
        if tx.license_by_key(&license.key).is_some() {
            return Err(LicensingError::Validation(format!(
                "license key {} already exists",
                license.key
            )));
        }

        let after = snapshot(&license)?;
        tx.insert_license(license.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Create,
            entity_type: EntityKind::License,
            entity_id: license.id.to_string(),
            timestamp: now,
            before: None,
            after: Some(after),
        });
        tx.commit();

        info!(
            license_id = %license.id,
            key = %license.key,
            total_seats = license.total_seats,
            "license registered"
        );
        Ok(license)
    }

    /// Update a license. The key and vendor are fixed at creation; the
    /// seat count may never drop below current utilization.
    pub async fn update(
        &self,
        id: LicenseId,
        input: UpdateLicenseInput,
        actor: Actor,
    ) -> Result<License> {
        policy::require(actor.role, Action::Update, EntityKind::License)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .license(&id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::License, id))?;

        if let Some(expected) = input.expected_updated_at {
            if expected != current.updated_at {
                return Err(LicensingError::conflict(EntityKind::License, id));
            }
        }

        let mut updated = current.clone();
        if let Some(product) = input.product {
            if product.trim().is_empty() {
                return Err(LicensingError::Validation(
                    "license product must not be empty".to_string(),
                ));
            }
            updated.product = product;
        }
        if let Some(total_seats) = input.total_seats {
            validate_seats(total_seats)?;
            let used = tx.active_seat_count(&id);
            if (total_seats as usize) < used {
                return Err(LicensingError::Validation(format!(
                    "cannot reduce total_seats to {total_seats}: {used} seat(s) are in use"
                )));
            }
            updated.total_seats = total_seats;
        }
        if let Some(valid_from) = input.valid_from {
            updated.valid_from = valid_from;
        }
        if let Some(valid_until) = input.valid_until {
            updated.valid_until = valid_until;
        }
        validate_window(updated.valid_from, updated.valid_until)?;
        if let Some(notes) = input.notes {
            updated.notes = Some(notes);
        }
        updated.updated_at = Utc::now();

        let before = snapshot(&current)?;
        let after = snapshot(&updated)?;
        tx.update_license(updated.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Update,
            entity_type: EntityKind::License,
            entity_id: id.to_string(),
            timestamp: updated.updated_at,
            before: Some(before),
            after: Some(after),
        });
        tx.commit();

        debug!(license_id = %id, "license updated");
        Ok(updated)
    }

    /// Delete a license. Fails while any active assignment draws on it;
    /// revoked assignment history is retained.
    pub async fn delete(&self, id: LicenseId, actor: Actor) -> Result<()> {
        policy::require(actor.role, Action::Delete, EntityKind::License)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .license(&id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::License, id))?;

        let active = tx.active_seat_count(&id);
        if active > 0 {
            return Err(LicensingError::Validation(format!(
                "license {id} has {active} active assignment(s)"
            )));
        }

        let before = snapshot(&current)?;
        tx.remove_license(&id);
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Delete,
            entity_type: EntityKind::License,
            entity_id: id.to_string(),
            timestamp: Utc::now(),
            before: Some(before),
            after: None,
        });
        tx.commit();

        info!(license_id = %id, key = %current.key, "license deleted");
        Ok(())
    }

    /// Fetch a license by id.
    pub async fn get(&self, id: &LicenseId) -> Result<Option<License>> {
        self.store.get_license(id).await
    }

    /// Fetch a license by its vendor-issued key.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<License>> {
        self.store.get_license_by_key(key).await
    }

    /// List licenses matching a filter.
    pub async fn list(&self, filter: &LicenseFilter, page: Page) -> Result<Vec<License>> {
        self.store.list_licenses(filter, page).await
    }

    /// Count licenses matching a filter.
    pub async fn count(&self, filter: &LicenseFilter) -> Result<usize> {
        self.store.count_licenses(filter).await
    }
}

fn validate_seats(total_seats: u32) -> Result<()> {
    if total_seats < 1 {
        return Err(LicensingError::Validation(
            "total_seats must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_window(valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> Result<()> {
    if valid_until <= valid_from {
        return Err(LicensingError::Validation(
            "valid_until must be after valid_from".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateVendorInput, Vendor};
    use crate::types::{Role, VendorId};
    use chrono::Duration;
    use uuid::Uuid;

    fn service() -> (LicenseService, EntityStore) {
        let store = EntityStore::new();
        (LicenseService::new(store.clone()), store)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    async fn seed_vendor(store: &EntityStore) -> VendorId {
        let now = Utc::now();
        let input = CreateVendorInput {
            name: "Juniper".to_string(),
            support_email: None,
        };
        let vendor = Vendor {
            id: VendorId::new(),
            name: input.name,
            support_email: input.support_email,
            created_at: now,
            updated_at: now,
        };
        let id = vendor.id;
        let mut tx = store.begin().await.unwrap();
        tx.insert_vendor(vendor);
        tx.commit();
        id
    }

    fn input(vendor_id: VendorId, key: &str, seats: u32) -> CreateLicenseInput {
        let now = Utc::now();
        CreateLicenseInput {
            key: key.to_string(),
            product: "Junos".to_string(),
            vendor_id,
            total_seats: seats,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(365),
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_writes_license_and_audit() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;

        let license = service
            .create(input(vendor_id, "LIC-1", 5), admin())
            .await
            .unwrap();

        assert_eq!(license.total_seats, 5);
        assert!(store.get_license(&license.id).await.unwrap().is_some());
        assert_eq!(store.audit_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn engineer_may_not_create_licenses() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;
        let engineer = Actor::new(Uuid::new_v4(), Role::Engineer);

        let err = service
            .create(input(vendor_id, "LIC-1", 5), engineer)
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn create_requires_existing_vendor() {
        let (service, _) = service();
        let err = service
            .create(input(VendorId::new(), "LIC-1", 5), admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LicensingError::NotFound {
                kind: EntityKind::Vendor,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rejects_zero_seats_and_inverted_window() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;

        let err = service
            .create(input(vendor_id, "LIC-1", 0), admin())
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));

        let mut bad = input(vendor_id, "LIC-2", 3);
        bad.valid_until = bad.valid_from - Duration::days(1);
        let err = service.create(bad, admin()).await.unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_key_rejected() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;
        service
            .create(input(vendor_id, "LIC-1", 5), admin())
            .await
            .unwrap();

        let err = service
            .create(input(vendor_id, "LIC-1", 3), admin())
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }

    #[tokio::test]
    async fn seat_count_cannot_drop_below_utilization() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;
        let license = service
            .create(input(vendor_id, "LIC-1", 3), admin())
            .await
            .unwrap();

        // occupy two seats directly in the store
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();
        for device in ["SW-1", "SW-2"] {
            tx.insert_assignment(crate::model::Assignment {
                id: crate::types::AssignmentId::new(),
                license_id: license.id,
                device_id: crate::types::DeviceId::new(device),
                assigned_by: Uuid::new_v4(),
                assigned_at: now,
                revoked_at: None,
            });
        }
        tx.commit();

        let err = service
            .update(
                license.id,
                UpdateLicenseInput {
                    total_seats: Some(1),
                    ..Default::default()
                },
                admin(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));

        // growing the pool is always fine
        let updated = service
            .update(
                license.id,
                UpdateLicenseInput {
                    total_seats: Some(10),
                    ..Default::default()
                },
                admin(),
            )
            .await
            .unwrap();
        assert_eq!(updated.total_seats, 10);
    }

    #[tokio::test]
    async fn delete_refused_with_active_assignment() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;
        let license = service
            .create(input(vendor_id, "LIC-1", 2), admin())
            .await
            .unwrap();

        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();
        tx.insert_assignment(crate::model::Assignment {
            id: crate::types::AssignmentId::new(),
            license_id: license.id,
            device_id: crate::types::DeviceId::new("SW-1"),
            assigned_by: Uuid::new_v4(),
            assigned_at: now,
            revoked_at: None,
        });
        tx.commit();

        let err = service.delete(license.id, admin()).await.unwrap_err();
        assert!(matches!(err, LicensingError::Validation(_)));
    }

    #[tokio::test]
    async fn list_filters_expired_only() {
        let (service, store) = service();
        let vendor_id = seed_vendor(&store).await;
        let now = Utc::now();

        service
            .create(input(vendor_id, "LIC-CURRENT", 5), admin())
            .await
            .unwrap();
        let mut expired = input(vendor_id, "LIC-OLD", 5);
        expired.valid_from = now - Duration::days(400);
        expired.valid_until = now - Duration::days(30);
        service.create(expired, admin()).await.unwrap();

        let filter = LicenseFilter {
            expired_only: true,
            ..Default::default()
        };
        let expired = service.list(&filter, Page::default()).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key, "LIC-OLD");
    }
}
