//! Validation request statuses
//!
//! The validation workflow owns these; the engine only reads them as triggers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ParseStatusError;

/// Status of a validation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Intake,
    Planning,
    InProgress,
    PendingApproval,
    Approved,
    Cancelled,
    OnHold,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::Intake,
        RequestStatus::Planning,
        RequestStatus::InProgress,
        RequestStatus::PendingApproval,
        RequestStatus::Approved,
        RequestStatus::Cancelled,
        RequestStatus::OnHold,
    ];

    /// Canonical label as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "INTAKE",
            Self::Planning => "PLANNING",
            Self::InProgress => "IN_PROGRESS",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Cancelled => "CANCELLED",
            Self::OnHold => "ON_HOLD",
        }
    }

    /// Trigger description recorded in the audit log when this status is reached.
    pub fn trigger_description(&self) -> String {
        format!("validation_request.status -> {}", self.as_str())
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError::new("validation request", s))
    }
}
