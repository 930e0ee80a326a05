//! Error types for the licensing engine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::policy::Action;
use crate::types::{AssignmentId, DeviceId, EntityKind, LicenseId, Role};

/// Errors returned by the licensing engine.
///
/// Every error is a typed result value surfaced to the caller; nothing is
/// swallowed. [`LicensingError::Timeout`] and [`LicensingError::Conflict`]
/// are safe for the calling layer to retry with backoff; every other
/// variant is terminal for that call.
#[derive(Debug, Error)]
pub enum LicensingError {
    /// The referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// The capability table denies the actor this operation.
    #[error("role {role} is not permitted to {action} on {resource}")]
    Forbidden {
        /// Role of the denied actor.
        role: Role,
        /// Action that was attempted.
        action: Action,
        /// Resource kind the action targeted.
        resource: EntityKind,
    },

    /// An active assignment for this (license, device) pair already exists.
    #[error("license {license_id} is already assigned to device {device_id}")]
    AlreadyAssigned {
        license_id: LicenseId,
        device_id: DeviceId,
    },

    /// The assignment was revoked by an earlier call.
    #[error("assignment {0} is already revoked")]
    AlreadyRevoked(AssignmentId),

    /// Every seat on the license is in use.
    #[error("license {license_id} has no free seats (all {total_seats} in use)")]
    CapacityExceeded {
        license_id: LicenseId,
        total_seats: u32,
    },

    /// The license validity window has passed.
    #[error("license {license_id} expired at {valid_until}")]
    ExpiredLicense {
        license_id: LicenseId,
        valid_until: DateTime<Utc>,
    },

    /// Malformed or rule-violating input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A store interaction exceeded its bounded timeout. Safe to retry.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The entity was modified concurrently and the caller's view is stale.
    /// Safe to retry after re-reading.
    #[error("{kind} {id} was modified concurrently; retry the operation")]
    Conflict {
        /// Kind of the contested entity.
        kind: EntityKind,
        /// Identifier of the contested entity.
        id: String,
    },

    /// An entity snapshot destined for the audit trail failed to serialize.
    /// The enclosing mutation is rolled back; mutations never succeed
    /// without their audit entry.
    #[error("audit snapshot serialization failed: {0}")]
    AuditSnapshot(#[from] serde_json::Error),
}

impl LicensingError {
    /// Whether the calling layer may automatically retry this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Conflict { .. })
    }

    /// Shorthand for a [`LicensingError::NotFound`].
    pub(crate) fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`LicensingError::Conflict`].
    pub(crate) fn conflict(kind: EntityKind, id: impl ToString) -> Self {
        Self::Conflict {
            kind,
            id: id.to_string(),
        }
    }
}

/// Convenience Result type for the licensing engine.
pub type Result<T> = std::result::Result<T, LicensingError>;
