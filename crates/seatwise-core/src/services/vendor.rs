//! Vendor service.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{LicensingError, Result};
use crate::model::audit::snapshot;
use crate::model::{AuditAction, CreateVendorInput, NewAuditEntry, UpdateVendorInput, Vendor};
use crate::policy::{self, Action};
use crate::store::EntityStore;
use crate::types::{Actor, EntityKind, Page, VendorId};

/// Service for managing vendors.
pub struct VendorService {
    store: EntityStore,
}

impl VendorService {
    /// Create a new vendor service.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Create a vendor.
    pub async fn create(&self, input: CreateVendorInput, actor: Actor) -> Result<Vendor> {
        policy::require(actor.role, Action::Create, EntityKind::Vendor)?;
        validate_name(&input.name)?;
        validate_email(input.support_email.as_deref())?;

        let now = Utc::now();
        let vendor = Vendor {
            id: VendorId::new(),
            name: input.name.trim().to_string(),
            support_email: input.support_email,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        let after = snapshot(&vendor)?;
        tx.insert_vendor(vendor.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Create,
            entity_type: EntityKind::Vendor,
            entity_id: vendor.id.to_string(),
            timestamp: now,
            before: None,
            after: Some(after),
        });
        tx.commit();

        info!(vendor_id = %vendor.id, name = %vendor.name, "vendor created");
        Ok(vendor)
    }

    /// Update a vendor. The name is immutable once licenses reference it.
    pub async fn update(
        &self,
        id: VendorId,
        input: UpdateVendorInput,
        actor: Actor,
    ) -> Result<Vendor> {
        policy::require(actor.role, Action::Update, EntityKind::Vendor)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .vendor(&id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::Vendor, id))?;

        if let Some(expected) = input.expected_updated_at {
            if expected != current.updated_at {
                return Err(LicensingError::conflict(EntityKind::Vendor, id));
            }
        }

        let mut updated = current.clone();
        if let Some(name) = input.name {
            if name.trim() != current.name {
                let license_count = tx.vendor_license_count(&id);
                if license_count > 0 {
                    return Err(LicensingError::Validation(format!(
                        "vendor name is immutable while {license_count} license(s) reference it"
                    )));
                }
                validate_name(&name)?;
                updated.name = name.trim().to_string();
            }
        }
        if let Some(email) = input.support_email {
            validate_email(Some(&email))?;
            updated.support_email = Some(email);
        }
        updated.updated_at = Utc::now();

        let before = snapshot(&current)?;
        let after = snapshot(&updated)?;
        tx.update_vendor(updated.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Update,
            entity_type: EntityKind::Vendor,
            entity_id: id.to_string(),
            timestamp: updated.updated_at,
            before: Some(before),
            after: Some(after),
        });
        tx.commit();

        debug!(vendor_id = %id, "vendor updated");
        Ok(updated)
    }

    /// Delete a vendor. Fails while any license references it.
    pub async fn delete(&self, id: VendorId, actor: Actor) -> Result<()> {
        policy::require(actor.role, Action::Delete, EntityKind::Vendor)?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .vendor(&id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::Vendor, id))?;

        let license_count = tx.vendor_license_count(&id);
        if license_count > 0 {
            return Err(LicensingError::Validation(format!(
                "vendor {id} is referenced by {license_count} license(s)"
            )));
        }

        let before = snapshot(&current)?;
        tx.remove_vendor(&id);
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Delete,
            entity_type: EntityKind::Vendor,
            entity_id: id.to_string(),
            timestamp: Utc::now(),
            before: Some(before),
            after: None,
        });
        tx.commit();

        info!(vendor_id = %id, "vendor deleted");
        Ok(())
    }

    /// Fetch a vendor by id.
    pub async fn get(&self, id: &VendorId) -> Result<Option<Vendor>> {
        self.store.get_vendor(id).await
    }

    /// List vendors ordered by name.
    pub async fn list(&self, page: Page) -> Result<Vec<Vendor>> {
        self.store.list_vendors(page).await
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LicensingError::Validation(
            "vendor name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: Option<&str>) -> Result<()> {
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(LicensingError::Validation(format!(
                "invalid support email: {email}"
            )));
        }
    }
    Ok(())
}
