//! License-to-device assignment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AssignmentId, DeviceId, LicenseId};

/// The binding of one license seat to one device.
///
/// An assignment is active while `revoked_at` is `None`, transitions to
/// revoked exactly once, and is never deleted — the full history is
/// retained for reporting and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Unique identifier.
    pub id: AssignmentId,
    /// License the seat is drawn from.
    pub license_id: LicenseId,
    /// Device holding the seat.
    pub device_id: DeviceId,
    /// Identity of the actor who created the assignment.
    pub assigned_by: Uuid,
    /// When the seat was taken.
    pub assigned_at: DateTime<Utc>,
    /// When the seat was released; `None` while active.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Whether this assignment currently occupies a seat.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}
