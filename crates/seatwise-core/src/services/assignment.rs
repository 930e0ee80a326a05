//! Assignment manager.
//!
//! Owns the binding of license seats to devices. The capacity check and
//! the assignment insert execute under one store transaction, so two
//! racing calls for the last seat serialize: exactly one commits, the
//! other observes the taken seat and fails with `CapacityExceeded`. A
//! retried `assign` after a success is rejected by the duplicate check
//! rather than double-applied.

use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{LicensingError, Result};
use crate::model::audit::snapshot;
use crate::model::{Assignment, AuditAction, NewAuditEntry};
use crate::policy::{self, Action};
use crate::store::EntityStore;
use crate::types::{Actor, AssignmentId, DeviceId, EntityKind, LicenseId};

/// Service for assigning and revoking license seats.
pub struct AssignmentService {
    store: EntityStore,
}

impl AssignmentService {
    /// Create a new assignment service.
    #[must_use]
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Assign a seat on `license_id` to `device_id`.
    ///
    /// Checks, in order: the actor's assign capability, license and device
    /// existence, license expiry, an existing active assignment for the
    /// pair, and remaining capacity. On success the new assignment and its
    /// audit entry commit atomically.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn assign(
        &self,
        license_id: LicenseId,
        device_id: DeviceId,
        actor: Actor,
    ) -> Result<Assignment> {
        policy::require(actor.role, Action::Assign, EntityKind::License)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let license = tx
            .license(&license_id)
            .ok_or_else(|| LicensingError::not_found(EntityKind::License, license_id))?;
        let total_seats = license.total_seats;
        let valid_until = license.valid_until;

        if tx.device(&device_id).is_none() {
            return Err(LicensingError::not_found(EntityKind::Device, &device_id));
        }
        if now > valid_until {
            return Err(LicensingError::ExpiredLicense {
                license_id,
                valid_until,
            });
        }
        if tx.active_assignment_between(&license_id, &device_id).is_some() {
            return Err(LicensingError::AlreadyAssigned {
                license_id,
                device_id,
            });
        }

        let used = tx.active_seat_count(&license_id);
        if used >= total_seats as usize {
            return Err(LicensingError::CapacityExceeded {
                license_id,
                total_seats,
            });
        }

        let assignment = Assignment {
            id: AssignmentId::new(),
            license_id,
            device_id: device_id.clone(),
            assigned_by: actor.id,
            assigned_at: now,
            revoked_at: None,
        };

        let after = snapshot(&assignment)?;
        tx.insert_assignment(assignment.clone());
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Assign,
            entity_type: EntityKind::Assignment,
            entity_id: assignment.id.to_string(),
            timestamp: now,
            before: None,
            after: Some(after),
        });
        tx.commit();

        info!(
            assignment_id = %assignment.id,
            license_id = %license_id,
            device_id = %device_id,
            used = used + 1,
            total_seats,
            "license assigned"
        );
        Ok(assignment)
    }

    /// Release the seat held by `assignment_id`.
    ///
    /// The assignment transitions from active to revoked exactly once and
    /// is never deleted; the revocation and its audit entry commit
    /// atomically.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn revoke(&self, assignment_id: AssignmentId, actor: Actor) -> Result<()> {
        policy::require(actor.role, Action::Revoke, EntityKind::License)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let current = tx
            .assignment(&assignment_id)
            .cloned()
            .ok_or_else(|| LicensingError::not_found(EntityKind::Assignment, assignment_id))?;
        if !current.is_active() {
            return Err(LicensingError::AlreadyRevoked(assignment_id));
        }

        let mut revoked = current.clone();
        revoked.revoked_at = Some(now);

        let before = snapshot(&current)?;
        let after = snapshot(&revoked)?;
        tx.update_assignment(revoked);
        tx.append_audit(NewAuditEntry {
            actor: actor.id,
            action: AuditAction::Revoke,
            entity_type: EntityKind::Assignment,
            entity_id: assignment_id.to_string(),
            timestamp: now,
            before: Some(before),
            after: Some(after),
        });
        tx.commit();

        info!(
            assignment_id = %assignment_id,
            license_id = %current.license_id,
            device_id = %current.device_id,
            "license assignment revoked"
        );
        Ok(())
    }

    /// Fetch an assignment by id.
    pub async fn get(&self, id: &AssignmentId) -> Result<Option<Assignment>> {
        self.store.get_assignment(id).await
    }

    /// Assignment history for a device, oldest first.
    pub async fn list_for_device(&self, device_id: &DeviceId) -> Result<Vec<Assignment>> {
        self.store.list_assignments_for_device(device_id).await
    }

    /// Assignment history for a license, oldest first.
    pub async fn list_for_license(&self, license_id: &LicenseId) -> Result<Vec<Assignment>> {
        self.store.list_assignments_for_license(license_id).await
    }
}
