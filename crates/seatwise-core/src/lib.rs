//! License assignment and compliance engine for network device fleets.
//!
//! Tracks licenses issued against network devices, detects compliance risk
//! (expiring or over-utilized licenses, at-risk devices), and records every
//! state-changing action in an append-only audit trail under role-gated
//! access. Transport, rendering, bulk-import parsing, and notification
//! delivery are external collaborators: they call the services here and
//! consume the events they return.
//!
//! # Components
//!
//! - [`store::EntityStore`] — the shared entity store; reads run
//!   concurrently, mutations go through an exclusive [`store::StoreTx`]
//!   that commits the mutation and its audit entry atomically (or rolls
//!   both back, including on cancellation).
//! - [`services::AssignmentService`] — assigns and revokes license seats,
//!   enforcing capacity and uniqueness under the transaction lock.
//! - [`services::ComplianceService`] — utilization, expiry windows,
//!   at-risk devices, and the recurring alert scan with duplicate
//!   suppression.
//! - [`services::VendorService`] / [`services::DeviceService`] /
//!   [`services::LicenseService`] / [`services::SoftwareService`] — entity
//!   CRUD with validation and per-mutation audit.
//! - [`services::AuditService`] — read-only queries over the trail.
//! - [`policy`] — the static role × action × resource capability table.
//!
//! # Errors
//!
//! Every fallible call returns [`error::LicensingError`];
//! [`error::LicensingError::is_retryable`] tells the calling layer whether
//! backoff-and-retry is safe.

pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod services;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigError, CoreConfig};
pub use error::{LicensingError, Result};
pub use model::{
    AlertCondition, AlertEvent, AlertSeverity, AlertSubject, Assignment, AuditAction, AuditEntry,
    AuditFilter, CreateDeviceInput, CreateLicenseInput, CreateVendorInput, Device, DeviceFilter,
    DeviceStatus, DeviceType, License, LicenseFilter, LicenseStatus, RecordSoftwareVersionInput,
    SoftwareVersion, UpdateDeviceInput, UpdateLicenseInput, UpdateVendorInput, Vendor,
};
pub use policy::{authorize, Action};
pub use services::{
    AssignmentService, AuditService, ComplianceReport, ComplianceService, DeviceService,
    LicenseService, SoftwareService, Utilization, UtilizationBand, VendorService,
};
pub use store::{EntityStore, StoreSnapshot, StoreTx};
pub use types::{
    Actor, AssignmentId, AuditEntryId, DeviceId, EntityKind, LicenseId, Page, Role,
    SoftwareVersionId, VendorId,
};
