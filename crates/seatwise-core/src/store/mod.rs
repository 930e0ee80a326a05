//! In-memory entity store with transactional writes.
//!
//! All six entity collections live in one [`StoreState`] behind a single
//! `RwLock`. Reads take the read lock and run concurrently; every mutation
//! goes through a [`StoreTx`] obtained from [`EntityStore::begin`], which
//! holds the write lock for the duration of the transaction. That makes a
//! check-then-act sequence (capacity verification followed by an insert)
//! atomic by construction, and lets an audit append commit in the same
//! unit as the mutation it describes.
//!
//! Every lock acquisition is bounded by the configured timeout and fails
//! with [`LicensingError::Timeout`] instead of blocking indefinitely.

mod tx;

pub use tx::StoreTx;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::config::CoreConfig;
use crate::error::{LicensingError, Result};
use crate::model::{
    Assignment, AuditEntry, AuditFilter, Device, DeviceFilter, License, LicenseFilter,
    SoftwareVersion, Vendor,
};
use crate::types::{
    AssignmentId, DeviceId, LicenseId, Page, SoftwareVersionId, VendorId,
};

/// Default bound on a single lock acquisition.
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Everything the engine persists, guarded by one lock.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) vendors: HashMap<VendorId, Vendor>,
    pub(crate) devices: HashMap<DeviceId, Device>,
    pub(crate) licenses: HashMap<LicenseId, License>,
    pub(crate) assignments: HashMap<AssignmentId, Assignment>,
    pub(crate) software_versions: HashMap<SoftwareVersionId, SoftwareVersion>,
    /// Append-only; rollback of an uncommitted transaction is the only
    /// code path that ever shortens it.
    pub(crate) audit_log: Vec<AuditEntry>,
    pub(crate) next_audit_seq: u64,
}

impl StoreState {
    pub(crate) fn active_seat_count(&self, license_id: &LicenseId) -> usize {
        self.assignments
            .values()
            .filter(|a| a.license_id == *license_id && a.is_active())
            .count()
    }
}

/// A consistent point-in-time view for compliance scans, cloned under one
/// read guard so utilization and expiry are computed against the same
/// state.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub licenses: Vec<License>,
    pub devices: Vec<Device>,
    pub assignments: Vec<Assignment>,
}

/// Handle to the shared entity store. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct EntityStore {
    state: Arc<RwLock<StoreState>>,
    op_timeout: Duration,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Create an empty store with the default operation timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_OP_TIMEOUT)
    }

    /// Create an empty store with a specific operation timeout.
    #[must_use]
    pub fn with_timeout(op_timeout: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            op_timeout,
        }
    }

    /// Create an empty store configured from [`CoreConfig`].
    #[must_use]
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::with_timeout(config.store_op_timeout())
    }

    /// Open a write transaction. Blocks concurrent mutations until the
    /// returned [`StoreTx`] commits or rolls back.
    pub async fn begin(&self) -> Result<StoreTx> {
        let guard = timeout(self.op_timeout, Arc::clone(&self.state).write_owned())
            .await
            .map_err(|_| LicensingError::Timeout(self.op_timeout))?;
        Ok(StoreTx::new(guard))
    }

    async fn with_read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T> {
        let guard = timeout(self.op_timeout, self.state.read())
            .await
            .map_err(|_| LicensingError::Timeout(self.op_timeout))?;
        Ok(f(&guard))
    }

    // ------------------------------------------------------------------
    // Vendors
    // ------------------------------------------------------------------

    /// Fetch a vendor by id.
    pub async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>> {
        self.with_read(|s| s.vendors.get(id).cloned()).await
    }

    /// List vendors ordered by name.
    pub async fn list_vendors(&self, page: Page) -> Result<Vec<Vendor>> {
        let page = page.clamped();
        self.with_read(|s| {
            let mut vendors: Vec<_> = s.vendors.values().cloned().collect();
            vendors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.0.cmp(&b.id.0)));
            vendors
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect()
        })
        .await
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    /// Fetch a device by id.
    pub async fn get_device(&self, id: &DeviceId) -> Result<Option<Device>> {
        self.with_read(|s| s.devices.get(id).cloned()).await
    }

    /// Fetch a device by management address.
    pub async fn get_device_by_ip(&self, ip: IpAddr) -> Result<Option<Device>> {
        self.with_read(|s| s.devices.values().find(|d| d.ip_address == ip).cloned())
            .await
    }

    /// List devices matching a filter, ordered by id.
    pub async fn list_devices(&self, filter: &DeviceFilter, page: Page) -> Result<Vec<Device>> {
        let page = page.clamped();
        self.with_read(|s| {
            let mut devices: Vec<_> = s
                .devices
                .values()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect();
            devices.sort_by(|a, b| a.id.cmp(&b.id));
            devices
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect()
        })
        .await
    }

    /// Count devices matching a filter.
    pub async fn count_devices(&self, filter: &DeviceFilter) -> Result<usize> {
        self.with_read(|s| s.devices.values().filter(|d| filter.matches(d)).count())
            .await
    }

    // ------------------------------------------------------------------
    // Licenses
    // ------------------------------------------------------------------

    /// Fetch a license by id.
    pub async fn get_license(&self, id: &LicenseId) -> Result<Option<License>> {
        self.with_read(|s| s.licenses.get(id).cloned()).await
    }

    /// Fetch a license by its vendor-issued key.
    pub async fn get_license_by_key(&self, key: &str) -> Result<Option<License>> {
        self.with_read(|s| s.licenses.values().find(|l| l.key == key).cloned())
            .await
    }

    /// List licenses matching a filter, ordered by key.
    pub async fn list_licenses(&self, filter: &LicenseFilter, page: Page) -> Result<Vec<License>> {
        let page = page.clamped();
        let now = Utc::now();
        self.with_read(|s| {
            let mut licenses: Vec<_> = s
                .licenses
                .values()
                .filter(|l| filter.matches(l, now))
                .cloned()
                .collect();
            licenses.sort_by(|a, b| a.key.cmp(&b.key));
            licenses
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect()
        })
        .await
    }

    /// Count licenses matching a filter.
    pub async fn count_licenses(&self, filter: &LicenseFilter) -> Result<usize> {
        let now = Utc::now();
        self.with_read(|s| s.licenses.values().filter(|l| filter.matches(l, now)).count())
            .await
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    /// Fetch an assignment by id.
    pub async fn get_assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>> {
        self.with_read(|s| s.assignments.get(id).cloned()).await
    }

    /// All assignments (active and revoked) for a device, oldest first.
    pub async fn list_assignments_for_device(&self, id: &DeviceId) -> Result<Vec<Assignment>> {
        self.with_read(|s| {
            let mut assignments: Vec<_> = s
                .assignments
                .values()
                .filter(|a| a.device_id == *id)
                .cloned()
                .collect();
            assignments
                .sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at).then(a.id.0.cmp(&b.id.0)));
            assignments
        })
        .await
    }

    /// All assignments (active and revoked) for a license, oldest first.
    pub async fn list_assignments_for_license(&self, id: &LicenseId) -> Result<Vec<Assignment>> {
        self.with_read(|s| {
            let mut assignments: Vec<_> = s
                .assignments
                .values()
                .filter(|a| a.license_id == *id)
                .cloned()
                .collect();
            assignments
                .sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at).then(a.id.0.cmp(&b.id.0)));
            assignments
        })
        .await
    }

    /// Number of seats currently in use on a license.
    pub async fn active_seat_count(&self, id: &LicenseId) -> Result<usize> {
        self.with_read(|s| s.active_seat_count(id)).await
    }

    // ------------------------------------------------------------------
    // Software versions
    // ------------------------------------------------------------------

    /// Software records for a device, most recently detected first.
    pub async fn list_software_for_device(
        &self,
        id: &DeviceId,
    ) -> Result<Vec<SoftwareVersion>> {
        self.with_read(|s| {
            let mut versions: Vec<_> = s
                .software_versions
                .values()
                .filter(|v| v.device_id == *id)
                .cloned()
                .collect();
            versions.sort_by(|a, b| b.detected_at.cmp(&a.detected_at).then(a.id.0.cmp(&b.id.0)));
            versions
        })
        .await
    }

    // ------------------------------------------------------------------
    // Audit trail
    // ------------------------------------------------------------------

    /// Query the audit trail, newest first; ties broken by append order.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let page = filter.page.clamped();
        self.with_read(|s| {
            let mut entries: Vec<_> = s
                .audit_log
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.seq.cmp(&a.seq)));
            entries
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect()
        })
        .await
    }

    /// Total number of audit entries.
    pub async fn audit_count(&self) -> Result<usize> {
        self.with_read(|s| s.audit_log.len()).await
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Clone the compliance-relevant state under one read guard.
    pub async fn snapshot(&self) -> Result<StoreSnapshot> {
        self.with_read(|s| StoreSnapshot {
            licenses: s.licenses.values().cloned().collect(),
            devices: s.devices.values().cloned().collect(),
            assignments: s.assignments.values().cloned().collect(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::audit::{AuditAction, NewAuditEntry};
    use crate::types::EntityKind;
    use uuid::Uuid;

    fn vendor(name: &str) -> Vendor {
        let now = Utc::now();
        Vendor {
            id: VendorId::new(),
            name: name.to_string(),
            support_email: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn audit_input(entity_id: &str) -> NewAuditEntry {
        NewAuditEntry {
            actor: Uuid::new_v4(),
            action: AuditAction::Create,
            entity_type: EntityKind::Vendor,
            entity_id: entity_id.to_string(),
            timestamp: Utc::now(),
            before: None,
            after: None,
        }
    }

    #[tokio::test]
    async fn committed_tx_persists() {
        let store = EntityStore::new();
        let v = vendor("Cisco");
        let id = v.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_vendor(v);
        tx.append_audit(audit_input(&id.to_string()));
        tx.commit();

        assert!(store.get_vendor(&id).await.unwrap().is_some());
        assert_eq!(store.audit_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dropped_tx_rolls_back_entities_and_audit() {
        let store = EntityStore::new();
        let v = vendor("Cisco");
        let id = v.id;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_vendor(v);
            tx.append_audit(audit_input(&id.to_string()));
            // dropped without commit, as when a caller disconnects mid-flight
        }

        assert!(store.get_vendor(&id).await.unwrap().is_none());
        assert_eq!(store.audit_count().await.unwrap(), 0);

        // the sequence counter rewinds too, so a later commit starts at 0
        let mut tx = store.begin().await.unwrap();
        tx.insert_vendor(vendor("Juniper"));
        tx.append_audit(audit_input("other"));
        tx.commit();
        let entries = store.query_audit(&AuditFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seq, 0);
    }

    #[tokio::test]
    async fn rollback_restores_updated_and_removed_rows() {
        let store = EntityStore::new();
        let v = vendor("Cisco");
        let id = v.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_vendor(v.clone());
        tx.commit();

        {
            let mut tx = store.begin().await.unwrap();
            let mut updated = v.clone();
            updated.name = "Renamed".to_string();
            tx.update_vendor(updated);
            tx.remove_vendor(&id);
        }

        let stored = store.get_vendor(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Cisco");
    }

    #[tokio::test]
    async fn audit_entries_preserve_append_order() {
        let store = EntityStore::new();
        let shared_ts = Utc::now();

        let mut tx = store.begin().await.unwrap();
        for i in 0..3 {
            let mut input = audit_input(&format!("entity-{i}"));
            input.timestamp = shared_ts;
            tx.append_audit(input);
        }
        tx.commit();

        let entries = store.query_audit(&AuditFilter::default()).await.unwrap();
        // newest first; identical timestamps fall back to append order
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].entity_id, "entity-2");
        assert_eq!(entries[2].entity_id, "entity-0");
    }

    #[tokio::test]
    async fn reads_time_out_while_a_writer_holds_the_lock() {
        let store = EntityStore::with_timeout(Duration::from_millis(20));
        let _tx = store.begin().await.unwrap();

        let err = store.get_vendor(&VendorId::new()).await.unwrap_err();
        assert!(matches!(err, LicensingError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn begin_times_out_behind_another_tx() {
        let store = EntityStore::with_timeout(Duration::from_millis(20));
        let _tx = store.begin().await.unwrap();

        let err = store.begin().await.unwrap_err();
        assert!(matches!(err, LicensingError::Timeout(_)));
    }
}
