//! Network device model.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DeviceId;

/// Classification of a network device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Router,
    Switch,
    Firewall,
    LoadBalancer,
    AccessPoint,
    Other,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Router => write!(f, "router"),
            Self::Switch => write!(f, "switch"),
            Self::Firewall => write!(f, "firewall"),
            Self::LoadBalancer => write!(f, "load_balancer"),
            Self::AccessPoint => write!(f, "access_point"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Operational status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// In service.
    #[default]
    Active,
    /// Temporarily out of service; may return.
    Inactive,
    /// Permanently retired. Excluded from risk scans.
    Decommissioned,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Decommissioned => write!(f, "decommissioned"),
        }
    }
}

/// A network device that licenses are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Operator-assigned unique identifier.
    pub id: DeviceId,
    /// Device classification.
    pub kind: DeviceType,
    /// Management address, unique across devices.
    pub ip_address: IpAddr,
    /// Physical or logical location.
    pub location: String,
    /// Hardware model.
    pub model: Option<String>,
    /// Operational status.
    pub status: DeviceStatus,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a device. The IP address arrives as a string and is
/// validated into an [`IpAddr`] by the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeviceInput {
    /// Operator-assigned identifier, non-empty.
    pub id: String,
    /// Device classification.
    pub kind: DeviceType,
    /// Management address (IPv4 or IPv6 literal).
    pub ip_address: String,
    /// Physical or logical location.
    pub location: String,
    /// Hardware model.
    pub model: Option<String>,
    /// Initial status; defaults to active.
    #[serde(default)]
    pub status: DeviceStatus,
}

/// Input for updating a device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDeviceInput {
    /// New classification.
    pub kind: Option<DeviceType>,
    /// New management address (IPv4 or IPv6 literal).
    pub ip_address: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New hardware model.
    pub model: Option<String>,
    /// New status.
    pub status: Option<DeviceStatus>,
    /// Optimistic concurrency guard against the stored `updated_at`.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Filter options for listing devices.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    /// Case-insensitive location substring.
    pub location_contains: Option<String>,
    /// Filter by classification.
    pub kind: Option<DeviceType>,
    /// Filter by status.
    pub status: Option<DeviceStatus>,
}

impl DeviceFilter {
    /// Whether a device passes this filter.
    #[must_use]
    pub fn matches(&self, device: &Device) -> bool {
        self.location_contains.as_ref().is_none_or(|needle| {
            device
                .location
                .to_lowercase()
                .contains(&needle.to_lowercase())
        }) && self.kind.is_none_or(|k| device.kind == k)
            && self.status.is_none_or(|s| device.status == s)
    }
}
