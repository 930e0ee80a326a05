//! Software version inventory model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, SoftwareVersionId};

/// A software package detected on a device. Informational only; carries no
/// cross-entity invariant beyond the owning device existing at record time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareVersion {
    /// Unique identifier.
    pub id: SoftwareVersionId,
    /// Device the software runs on.
    pub device_id: DeviceId,
    /// Product name.
    pub product: String,
    /// Version string as reported by the device.
    pub version: String,
    /// When the version was observed.
    pub detected_at: DateTime<Utc>,
}

/// Input for recording a software version observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSoftwareVersionInput {
    /// Device the software runs on; must exist.
    pub device_id: DeviceId,
    /// Product name.
    pub product: String,
    /// Version string.
    pub version: String,
    /// Observation time; defaults to now.
    pub detected_at: Option<DateTime<Utc>>,
}
