//! Write transactions over the entity store.

use std::net::IpAddr;

use tokio::sync::OwnedRwLockWriteGuard;
use tracing::debug;

use super::StoreState;
use crate::model::{
    Assignment, AuditEntry, Device, License, NewAuditEntry, SoftwareVersion, Vendor,
};
use crate::types::{AssignmentId, AuditEntryId, DeviceId, LicenseId, SoftwareVersionId, VendorId};

/// Inverse of one staged mutation.
enum Undo {
    RemoveVendor(VendorId),
    RestoreVendor(Box<Vendor>),
    RemoveDevice(DeviceId),
    RestoreDevice(Box<Device>),
    RemoveLicense(LicenseId),
    RestoreLicense(Box<License>),
    RemoveAssignment(AssignmentId),
    RestoreAssignment(Box<Assignment>),
    RemoveSoftware(SoftwareVersionId),
    RestoreSoftware(Box<SoftwareVersion>),
    PopAudit,
}

/// An exclusive write transaction.
///
/// Holds the store's write lock, so all checks performed through it stay
/// valid until [`StoreTx::commit`]. Mutations are applied immediately but
/// recorded in an undo log; dropping the transaction without committing —
/// including when the owning future is cancelled — rolls every staged
/// change back in reverse order. No other caller can observe intermediate
/// state either way.
pub struct StoreTx {
    guard: OwnedRwLockWriteGuard<StoreState>,
    undo: Vec<Undo>,
    committed: bool,
}

impl std::fmt::Debug for StoreTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreTx")
            .field("staged", &self.undo.len())
            .field("committed", &self.committed)
            .finish()
    }
}

impl StoreTx {
    pub(crate) fn new(guard: OwnedRwLockWriteGuard<StoreState>) -> Self {
        Self {
            guard,
            undo: Vec::new(),
            committed: false,
        }
    }

    /// Make every staged mutation permanent and release the lock.
    pub fn commit(mut self) {
        self.committed = true;
        self.undo.clear();
    }

    // ------------------------------------------------------------------
    // Reads (valid until commit — the write lock is held)
    // ------------------------------------------------------------------

    /// Vendor by id.
    #[must_use]
    pub fn vendor(&self, id: &VendorId) -> Option<&Vendor> {
        self.guard.vendors.get(id)
    }

    /// Device by id.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.guard.devices.get(id)
    }

    /// Device by management address.
    #[must_use]
    pub fn device_by_ip(&self, ip: IpAddr) -> Option<&Device> {
        self.guard.devices.values().find(|d| d.ip_address == ip)
    }

    /// License by id.
    #[must_use]
    pub fn license(&self, id: &LicenseId) -> Option<&License> {
        self.guard.licenses.get(id)
    }

    /// License by vendor-issued key.
    #[must_use]
    pub fn license_by_key(&self, key: &str) -> Option<&License> {
        self.guard.licenses.values().find(|l| l.key == key)
    }

    /// Assignment by id.
    #[must_use]
    pub fn assignment(&self, id: &AssignmentId) -> Option<&Assignment> {
        self.guard.assignments.get(id)
    }

    /// The active assignment binding a license to a device, if any.
    #[must_use]
    pub fn active_assignment_between(
        &self,
        license_id: &LicenseId,
        device_id: &DeviceId,
    ) -> Option<&Assignment> {
        self.guard
            .assignments
            .values()
            .find(|a| a.license_id == *license_id && a.device_id == *device_id && a.is_active())
    }

    /// Number of seats currently in use on a license.
    #[must_use]
    pub fn active_seat_count(&self, license_id: &LicenseId) -> usize {
        self.guard.active_seat_count(license_id)
    }

    /// Number of active assignments held by a device.
    #[must_use]
    pub fn device_active_assignment_count(&self, device_id: &DeviceId) -> usize {
        self.guard
            .assignments
            .values()
            .filter(|a| a.device_id == *device_id && a.is_active())
            .count()
    }

    /// Number of licenses referencing a vendor.
    #[must_use]
    pub fn vendor_license_count(&self, vendor_id: &VendorId) -> usize {
        self.guard
            .licenses
            .values()
            .filter(|l| l.vendor_id == *vendor_id)
            .count()
    }

    /// Software record by id.
    #[must_use]
    pub fn software_version(&self, id: &SoftwareVersionId) -> Option<&SoftwareVersion> {
        self.guard.software_versions.get(id)
    }

    /// Software record ids for a device.
    #[must_use]
    pub fn software_ids_for_device(&self, device_id: &DeviceId) -> Vec<SoftwareVersionId> {
        self.guard
            .software_versions
            .values()
            .filter(|v| v.device_id == *device_id)
            .map(|v| v.id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Stage a new vendor.
    pub fn insert_vendor(&mut self, vendor: Vendor) {
        let id = vendor.id;
        match self.guard.vendors.insert(id, vendor) {
            Some(old) => self.undo.push(Undo::RestoreVendor(Box::new(old))),
            None => self.undo.push(Undo::RemoveVendor(id)),
        }
    }

    /// Stage a replacement for an existing vendor.
    pub fn update_vendor(&mut self, vendor: Vendor) {
        self.insert_vendor(vendor);
    }

    /// Stage removal of a vendor.
    pub fn remove_vendor(&mut self, id: &VendorId) {
        if let Some(old) = self.guard.vendors.remove(id) {
            self.undo.push(Undo::RestoreVendor(Box::new(old)));
        }
    }

    /// Stage a new device.
    pub fn insert_device(&mut self, device: Device) {
        let id = device.id.clone();
        match self.guard.devices.insert(id.clone(), device) {
            Some(old) => self.undo.push(Undo::RestoreDevice(Box::new(old))),
            None => self.undo.push(Undo::RemoveDevice(id)),
        }
    }

    /// Stage a replacement for an existing device.
    pub fn update_device(&mut self, device: Device) {
        self.insert_device(device);
    }

    /// Stage removal of a device.
    pub fn remove_device(&mut self, id: &DeviceId) {
        if let Some(old) = self.guard.devices.remove(id) {
            self.undo.push(Undo::RestoreDevice(Box::new(old)));
        }
    }

    /// Stage a new license.
    pub fn insert_license(&mut self, license: License) {
        let id = license.id;
        match self.guard.licenses.insert(id, license) {
            Some(old) => self.undo.push(Undo::RestoreLicense(Box::new(old))),
            None => self.undo.push(Undo::RemoveLicense(id)),
        }
    }

    /// Stage a replacement for an existing license.
    pub fn update_license(&mut self, license: License) {
        self.insert_license(license);
    }

    /// Stage removal of a license.
    pub fn remove_license(&mut self, id: &LicenseId) {
        if let Some(old) = self.guard.licenses.remove(id) {
            self.undo.push(Undo::RestoreLicense(Box::new(old)));
        }
    }

    /// Stage a new assignment.
    pub fn insert_assignment(&mut self, assignment: Assignment) {
        let id = assignment.id;
        match self.guard.assignments.insert(id, assignment) {
            Some(old) => self.undo.push(Undo::RestoreAssignment(Box::new(old))),
            None => self.undo.push(Undo::RemoveAssignment(id)),
        }
    }

    /// Stage a replacement for an existing assignment (the revoke
    /// transition). Assignments are never removed.
    pub fn update_assignment(&mut self, assignment: Assignment) {
        self.insert_assignment(assignment);
    }

    /// Stage a new software record.
    pub fn insert_software_version(&mut self, version: SoftwareVersion) {
        let id = version.id;
        match self.guard.software_versions.insert(id, version) {
            Some(old) => self.undo.push(Undo::RestoreSoftware(Box::new(old))),
            None => self.undo.push(Undo::RemoveSoftware(id)),
        }
    }

    /// Stage removal of a software record.
    pub fn remove_software_version(&mut self, id: &SoftwareVersionId) {
        if let Some(old) = self.guard.software_versions.remove(id) {
            self.undo.push(Undo::RestoreSoftware(Box::new(old)));
        }
    }

    /// Append an audit entry describing a mutation staged in this
    /// transaction. Commits or rolls back with it.
    pub fn append_audit(&mut self, input: NewAuditEntry) -> AuditEntry {
        let entry = AuditEntry {
            id: AuditEntryId::new(),
            seq: self.guard.next_audit_seq,
            actor: input.actor,
            action: input.action,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            timestamp: input.timestamp,
            before: input.before,
            after: input.after,
        };
        self.guard.next_audit_seq += 1;
        self.guard.audit_log.push(entry.clone());
        self.undo.push(Undo::PopAudit);
        entry
    }
}

impl Drop for StoreTx {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if !self.undo.is_empty() {
            debug!(staged_ops = self.undo.len(), "rolling back uncommitted transaction");
        }
        for op in self.undo.drain(..).rev() {
            let state = &mut *self.guard;
            match op {
                Undo::RemoveVendor(id) => {
                    state.vendors.remove(&id);
                }
                Undo::RestoreVendor(v) => {
                    state.vendors.insert(v.id, *v);
                }
                Undo::RemoveDevice(id) => {
                    state.devices.remove(&id);
                }
                Undo::RestoreDevice(d) => {
                    state.devices.insert(d.id.clone(), *d);
                }
                Undo::RemoveLicense(id) => {
                    state.licenses.remove(&id);
                }
                Undo::RestoreLicense(l) => {
                    state.licenses.insert(l.id, *l);
                }
                Undo::RemoveAssignment(id) => {
                    state.assignments.remove(&id);
                }
                Undo::RestoreAssignment(a) => {
                    state.assignments.insert(a.id, *a);
                }
                Undo::RemoveSoftware(id) => {
                    state.software_versions.remove(&id);
                }
                Undo::RestoreSoftware(v) => {
                    state.software_versions.insert(v.id, *v);
                }
                Undo::PopAudit => {
                    state.audit_log.pop();
                    state.next_audit_seq -= 1;
                }
            }
        }
    }
}
