//! Vendor model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::VendorId;

/// A vendor that issues licenses.
///
/// Once any license references the vendor its name is immutable; the
/// contact fields stay editable over its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    /// Unique identifier.
    pub id: VendorId,
    /// Display name.
    pub name: String,
    /// Support contact address.
    pub support_email: Option<String>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVendorInput {
    /// Display name.
    pub name: String,
    /// Support contact address.
    pub support_email: Option<String>,
}

/// Input for updating a vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVendorInput {
    /// New name. Rejected once licenses reference the vendor.
    pub name: Option<String>,
    /// New support contact address.
    pub support_email: Option<String>,
    /// Optimistic concurrency guard: if set, the update fails with a
    /// retryable conflict unless it matches the stored `updated_at`.
    pub expected_updated_at: Option<DateTime<Utc>>,
}
