//! Model version lifecycle states
//!
//! States in nominal progression order:
//! DRAFT → IN_VALIDATION → APPROVED → ACTIVE → SUPERSEDED
//!
//! The only backward edge is IN_VALIDATION → DRAFT (request cancelled or put on hold).
//! SUPERSEDED has no outgoing transition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ParseStatusError;

/// Lifecycle status of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    /// Newly created; editable and deletable.
    Draft,

    /// Linked validation request is in progress.
    InValidation,

    /// Validation approved; waiting for manual activation.
    Approved,

    /// The model's single live version.
    Active,

    /// Replaced by a newer active version. Terminal.
    Superseded,
}

/// Row of the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPermissions {
    pub editable: bool,
    pub deletable: bool,
    /// Can accept an APPROVED trigger from its validation request.
    pub approvable: bool,
    pub activatable: bool,
}

impl VersionStatus {
    /// All statuses in progression order.
    pub const ALL: [VersionStatus; 5] = [
        VersionStatus::Draft,
        VersionStatus::InValidation,
        VersionStatus::Approved,
        VersionStatus::Active,
        VersionStatus::Superseded,
    ];

    /// Canonical label as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InValidation => "IN_VALIDATION",
            Self::Approved => "APPROVED",
            Self::Active => "ACTIVE",
            Self::Superseded => "SUPERSEDED",
        }
    }

    /// Permission table lookup.
    pub fn permissions(&self) -> StatusPermissions {
        match self {
            Self::Draft => StatusPermissions {
                editable: true,
                deletable: true,
                approvable: false,
                activatable: false,
            },
            Self::InValidation => StatusPermissions {
                editable: false,
                deletable: false,
                approvable: true,
                activatable: false,
            },
            Self::Approved => StatusPermissions {
                editable: false,
                deletable: false,
                approvable: false,
                activatable: true,
            },
            Self::Active | Self::Superseded => StatusPermissions {
                editable: false,
                deletable: false,
                approvable: false,
                activatable: false,
            },
        }
    }

    pub fn is_editable(&self) -> bool {
        self.permissions().editable
    }

    pub fn is_deletable(&self) -> bool {
        self.permissions().deletable
    }

    pub fn is_approvable(&self) -> bool {
        self.permissions().approvable
    }

    pub fn is_activatable(&self) -> bool {
        self.permissions().activatable
    }

    /// No transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VersionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError::new("version", s))
    }
}
