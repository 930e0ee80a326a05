//! Alert events emitted by the compliance evaluator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, LicenseId};

/// Compliance condition that triggers an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    /// A license entered the expiry warning window.
    ExpiringSoon,
    /// A license crossed the over-utilization threshold.
    OverUtilized,
    /// A device started holding an expired or over-utilized license.
    DeviceAtRisk,
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpiringSoon => write!(f, "expiring_soon"),
            Self::OverUtilized => write!(f, "over_utilized"),
            Self::DeviceAtRisk => write!(f, "device_at_risk"),
        }
    }
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// What an alert is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSubject {
    /// A license-level condition.
    License(LicenseId),
    /// A device-level condition.
    Device(DeviceId),
}

impl fmt::Display for AlertSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::License(id) => write!(f, "license {id}"),
            Self::Device(id) => write!(f, "device {id}"),
        }
    }
}

/// One newly-crossed compliance threshold, produced by the recurring scan
/// and handed to the notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// License or device the condition applies to.
    pub subject: AlertSubject,
    /// Which threshold was crossed.
    pub condition: AlertCondition,
    /// How urgent the condition is.
    pub severity: AlertSeverity,
    /// When the scan observed the condition.
    pub detected_at: DateTime<Utc>,
    /// Human-readable summary for the notification.
    pub message: String,
}
