//! Access policy guard.
//!
//! A static capability table mapping (role, action, resource kind) to
//! allow/deny, evaluated as a pure function. There is no per-request state
//! and nothing to cache, so role data can never go stale. Services consult
//! [`require`] before touching any state; a denied call performs no
//! mutation and writes no audit entry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LicensingError, Result};
use crate::types::{EntityKind, Role};

/// Action an actor may attempt against a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    Assign,
    Revoke,
    Read,
    ManageUsers,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Assign => write!(f, "assign"),
            Self::Revoke => write!(f, "revoke"),
            Self::Read => write!(f, "read"),
            Self::ManageUsers => write!(f, "manage_users"),
        }
    }
}

/// Evaluate the capability table.
///
/// | Role     | C/U/D Device, SoftwareVersion | C/U/D License, Vendor | Assign/Revoke | Read | ManageUsers |
/// |----------|------|-----|-----|-----|-----|
/// | Admin    | yes  | yes | yes | yes | yes |
/// | Engineer | yes  | no  | yes | yes | no  |
/// | Auditor  | no   | no  | no  | yes | no  |
#[must_use]
pub const fn authorize(role: Role, action: Action, resource: EntityKind) -> bool {
    match role {
        Role::Admin => true,
        Role::Engineer => match action {
            Action::Read => true,
            Action::Create | Action::Update | Action::Delete => matches!(
                resource,
                EntityKind::Device | EntityKind::SoftwareVersion
            ),
            Action::Assign | Action::Revoke => matches!(resource, EntityKind::License),
            Action::ManageUsers => false,
        },
        Role::Auditor => matches!(action, Action::Read),
    }
}

/// Check the capability table, returning [`LicensingError::Forbidden`] on
/// denial.
pub fn require(role: Role, action: Action, resource: EntityKind) -> Result<()> {
    if authorize(role, action, resource) {
        Ok(())
    } else {
        Err(LicensingError::Forbidden {
            role,
            action,
            resource,
        })
    }
}
