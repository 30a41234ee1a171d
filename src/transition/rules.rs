//! Trigger table
//!
//! | Request becomes | Version must be | Version becomes |
//! |-----------------|-----------------|-----------------|
//! | IN_PROGRESS     | DRAFT           | IN_VALIDATION   |
//! | APPROVED        | IN_VALIDATION   | APPROVED        |
//! | CANCELLED       | IN_VALIDATION   | DRAFT           |
//! | ON_HOLD         | IN_VALIDATION   | DRAFT           |
//!
//! Every other pair is a no-op.

use crate::status::{RequestStatus, VersionStatus};

/// One row of the trigger table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRule {
    pub request: RequestStatus,
    pub from: VersionStatus,
    pub to: VersionStatus,
}

pub const TRIGGER_RULES: [TriggerRule; 4] = [
    TriggerRule {
        request: RequestStatus::InProgress,
        from: VersionStatus::Draft,
        to: VersionStatus::InValidation,
    },
    TriggerRule {
        request: RequestStatus::Approved,
        from: VersionStatus::InValidation,
        to: VersionStatus::Approved,
    },
    TriggerRule {
        request: RequestStatus::Cancelled,
        from: VersionStatus::InValidation,
        to: VersionStatus::Draft,
    },
    TriggerRule {
        request: RequestStatus::OnHold,
        from: VersionStatus::InValidation,
        to: VersionStatus::Draft,
    },
];

/// Status a linked version should move to, or `None` to leave it unchanged.
///
/// Trigger statuses list every version status explicitly so a new status
/// variant forces a decision here.
pub fn desired_status(request: RequestStatus, current: VersionStatus) -> Option<VersionStatus> {
    use RequestStatus as R;
    use VersionStatus as V;

    match (request, current) {
        (R::InProgress, V::Draft) => Some(V::InValidation),
        (R::InProgress, V::InValidation | V::Approved | V::Active | V::Superseded) => None,

        (R::Approved, V::InValidation) => Some(V::Approved),
        (R::Approved, V::Draft | V::Approved | V::Active | V::Superseded) => None,

        (R::Cancelled | R::OnHold, V::InValidation) => Some(V::Draft),
        (R::Cancelled | R::OnHold, V::Draft | V::Approved | V::Active | V::Superseded) => None,

        // Workflow-internal statuses carry no version trigger
        (R::Intake | R::Planning | R::PendingApproval, _) => None,
    }
}

/// Whether a request status can change any version status at all.
pub fn is_trigger(request: RequestStatus) -> bool {
    TRIGGER_RULES.iter().any(|rule| rule.request == request)
}
