//! Type definitions shared across the licensing domain.
//!
//! Includes newtype wrappers for IDs, the actor/role model, and enums used
//! by more than one module.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Unique identifier for a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub Uuid);

impl VendorId {
    /// Create a new random VendorId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for VendorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for VendorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<VendorId> for Uuid {
    fn from(id: VendorId) -> Self {
        id.0
    }
}

/// Unique identifier for a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(pub Uuid);

impl LicenseId {
    /// Create a new random LicenseId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for LicenseId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<LicenseId> for Uuid {
    fn from(id: LicenseId) -> Self {
        id.0
    }
}

/// Unique identifier for a license-to-device assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(pub Uuid);

impl AssignmentId {
    /// Create a new random AssignmentId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AssignmentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<AssignmentId> for Uuid {
    fn from(id: AssignmentId) -> Self {
        id.0
    }
}

/// Unique identifier for a software version record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoftwareVersionId(pub Uuid);

impl SoftwareVersionId {
    /// Create a new random SoftwareVersionId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for SoftwareVersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SoftwareVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SoftwareVersionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<SoftwareVersionId> for Uuid {
    fn from(id: SoftwareVersionId) -> Self {
        id.0
    }
}

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    /// Create a new random AuditEntryId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AuditEntryId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Operator-assigned identifier for a network device (e.g. `SW-CORE-01`).
///
/// Unlike the UUID-backed IDs above, device identifiers come from the
/// inventory system and are meaningful to operators, so the raw string is
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a raw device identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Actors and Roles
// ============================================================================

/// Role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including user management.
    Admin,
    /// Manages devices and software inventory, assigns and revokes licenses.
    Engineer,
    /// Read-only access for compliance review.
    Auditor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Engineer => write!(f, "engineer"),
            Self::Auditor => write!(f, "auditor"),
        }
    }
}

/// An authenticated actor as supplied by the API layer.
///
/// The engine never resolves or caches role data itself; the identity and
/// role arrive with each call and are checked against the capability table
/// before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identity of the actor.
    pub id: Uuid,
    /// Role the actor holds for this operation.
    pub role: Role,
}

impl Actor {
    /// Create an actor from an identity and role.
    #[must_use]
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

// ============================================================================
// Shared Enums
// ============================================================================

/// Kind of entity a permission check, error, or audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Vendor,
    Device,
    License,
    Assignment,
    SoftwareVersion,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Device => write!(f, "device"),
            Self::License => write!(f, "license"),
            Self::Assignment => write!(f, "assignment"),
            Self::SoftwareVersion => write!(f, "software_version"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Pagination options for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// Maximum number of results, clamped to [1, 100].
    pub limit: usize,
    /// Number of results to skip.
    pub offset: usize,
}

impl Page {
    /// Apply the clamping rules used by every list query.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, 100),
            offset: self.offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}
