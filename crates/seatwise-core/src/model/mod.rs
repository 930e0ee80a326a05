//! Entity models and their create/update inputs.

pub mod alert;
pub mod assignment;
pub mod audit;
pub mod device;
pub mod license;
pub mod software_version;
pub mod vendor;

pub use alert::{AlertCondition, AlertEvent, AlertSeverity, AlertSubject};
pub use assignment::Assignment;
pub use audit::{AuditAction, AuditEntry, AuditFilter, NewAuditEntry};
pub use device::{CreateDeviceInput, Device, DeviceFilter, DeviceStatus, DeviceType, UpdateDeviceInput};
pub use license::{CreateLicenseInput, License, LicenseFilter, LicenseStatus, UpdateLicenseInput};
pub use software_version::{RecordSoftwareVersionInput, SoftwareVersion};
pub use vendor::{CreateVendorInput, UpdateVendorInput, Vendor};
