//! License model.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LicenseId, VendorId};

/// Validity status of a license, derived from its dates. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// `valid_from` is still in the future.
    Pending,
    /// Inside the validity window.
    Active,
    /// Past `valid_until`.
    Expired,
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A purchased license with a fixed number of seats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    /// Unique identifier.
    pub id: LicenseId,
    /// Vendor-issued key, unique across licenses.
    pub key: String,
    /// Product the license covers.
    pub product: String,
    /// Issuing vendor.
    pub vendor_id: VendorId,
    /// Number of seats purchased, at least 1. Never reducible below the
    /// number of seats currently in use.
    pub total_seats: u32,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window, strictly after `valid_from`.
    pub valid_until: DateTime<Utc>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl License {
    /// Validity status at `now`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> LicenseStatus {
        if now < self.valid_from {
            LicenseStatus::Pending
        } else if now > self.valid_until {
            LicenseStatus::Expired
        } else {
            LicenseStatus::Active
        }
    }

    /// Whether the license is past its validity window at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    /// Whether `valid_until` falls within `[now, now + days]`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        self.valid_until >= now && self.valid_until <= now + Duration::days(days)
    }

    /// Whole days until expiry at `now`; negative once expired.
    #[must_use]
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.valid_until - now).num_days()
    }
}

/// Input for creating a license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLicenseInput {
    /// Vendor-issued key, unique across licenses.
    pub key: String,
    /// Product the license covers.
    pub product: String,
    /// Issuing vendor; must exist.
    pub vendor_id: VendorId,
    /// Number of seats purchased, at least 1.
    pub total_seats: u32,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window, strictly after `valid_from`.
    pub valid_until: DateTime<Utc>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Input for updating a license. The key and vendor are fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLicenseInput {
    /// New product name.
    pub product: Option<String>,
    /// New seat count. Rejected below current utilization.
    pub total_seats: Option<u32>,
    /// New start of the validity window.
    pub valid_from: Option<DateTime<Utc>>,
    /// New end of the validity window.
    pub valid_until: Option<DateTime<Utc>>,
    /// New notes.
    pub notes: Option<String>,
    /// Optimistic concurrency guard against the stored `updated_at`.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Filter options for listing licenses.
#[derive(Debug, Clone, Default)]
pub struct LicenseFilter {
    /// Filter by issuing vendor.
    pub vendor_id: Option<VendorId>,
    /// Case-insensitive product substring.
    pub product_contains: Option<String>,
    /// Only licenses already past `valid_until`.
    pub expired_only: bool,
}

impl LicenseFilter {
    /// Whether a license passes this filter at `now`.
    #[must_use]
    pub fn matches(&self, license: &License, now: DateTime<Utc>) -> bool {
        self.vendor_id.is_none_or(|v| license.vendor_id == v)
            && self.product_contains.as_ref().is_none_or(|needle| {
                license
                    .product
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
            && (!self.expired_only || license.is_expired(now))
    }
}
