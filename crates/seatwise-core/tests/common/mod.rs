//! Shared fixtures for seatwise-core integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use seatwise_core::{
    Actor, AssignmentService, AuditService, ComplianceService, CoreConfig, CreateDeviceInput,
    CreateLicenseInput, CreateVendorInput, Device, DeviceService, EntityStore, License,
    LicenseService, Role, SoftwareService, Vendor, VendorService,
};

/// All services wired over one shared store, plus one actor per role.
pub struct TestContext {
    pub store: EntityStore,
    pub vendors: VendorService,
    pub devices: DeviceService,
    pub licenses: LicenseService,
    pub software: SoftwareService,
    pub assignments: AssignmentService,
    pub compliance: ComplianceService,
    pub audit: AuditService,
    pub admin: Actor,
    pub engineer: Actor,
    pub auditor: Actor,
}

impl TestContext {
    /// Create an isolated context with default configuration.
    pub fn new() -> Self {
        let store = EntityStore::new();
        Self {
            vendors: VendorService::new(store.clone()),
            devices: DeviceService::new(store.clone()),
            licenses: LicenseService::new(store.clone()),
            software: SoftwareService::new(store.clone()),
            assignments: AssignmentService::new(store.clone()),
            compliance: ComplianceService::new(store.clone(), CoreConfig::default()),
            audit: AuditService::new(store.clone()),
            admin: Actor::new(Uuid::new_v4(), Role::Admin),
            engineer: Actor::new(Uuid::new_v4(), Role::Engineer),
            auditor: Actor::new(Uuid::new_v4(), Role::Auditor),
            store,
        }
    }

    pub async fn seed_vendor(&self, name: &str) -> Vendor {
        self.vendors
            .create(
                CreateVendorInput {
                    name: name.to_string(),
                    support_email: None,
                },
                self.admin,
            )
            .await
            .expect("seed vendor")
    }

    /// A license valid from 30 days ago until `valid_until`.
    pub async fn seed_license_until(
        &self,
        key: &str,
        seats: u32,
        valid_until: DateTime<Utc>,
    ) -> License {
        let vendor = self.seed_vendor(&format!("vendor-{key}")).await;
        self.licenses
            .create(
                CreateLicenseInput {
                    key: key.to_string(),
                    product: format!("product-{key}"),
                    vendor_id: vendor.id,
                    total_seats: seats,
                    valid_from: valid_until - Duration::days(395),
                    valid_until,
                    notes: None,
                },
                self.admin,
            )
            .await
            .expect("seed license")
    }

    /// A license valid for another `valid_days` days.
    pub async fn seed_license(&self, key: &str, seats: u32, valid_days: i64) -> License {
        self.seed_license_until(key, seats, Utc::now() + Duration::days(valid_days))
            .await
    }

    pub async fn seed_device(&self, id: &str, ip: &str) -> Device {
        self.devices
            .create(
                CreateDeviceInput {
                    id: id.to_string(),
                    kind: seatwise_core::DeviceType::Switch,
                    ip_address: ip.to_string(),
                    location: "DC-1".to_string(),
                    model: None,
                    status: Default::default(),
                },
                self.engineer,
            )
            .await
            .expect("seed device")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
