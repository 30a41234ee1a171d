//! Guard Layer
//!
//! Permission checks invoked before mutating a version or a validation request.
//!
//! Two independent gates:
//! - status gate: the permission table in [`crate::status`]
//! - capability gate: the actor must be the model's owner, its developer, or an admin
//!
//! Guard checks are deterministic and side-effect free.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Actor, DeploymentScope, Model, ModelVersion};
use crate::errors::{EngineError, EngineResult};
use crate::status::VersionStatus;

/// Status-gated operations on a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Edit,
    Delete,
    /// Accept an APPROVED trigger from the linked validation request.
    Approve,
    Activate,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Edit,
        Operation::Delete,
        Operation::Approve,
        Operation::Activate,
    ];

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Approve => "approve",
            Self::Activate => "activate",
        }
    }

    /// The single status from which this operation is permitted.
    pub fn required_status(&self) -> VersionStatus {
        match self {
            Self::Edit | Self::Delete => VersionStatus::Draft,
            Self::Approve => VersionStatus::InValidation,
            Self::Activate => VersionStatus::Approved,
        }
    }

    /// Whether the permission table allows this operation from `status`.
    pub fn permitted_from(&self, status: VersionStatus) -> bool {
        match self {
            Self::Edit => status.is_editable(),
            Self::Delete => status.is_deletable(),
            Self::Approve => status.is_approvable(),
            Self::Activate => status.is_activatable(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// An operation was attempted from a status the permission table forbids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {} version with status {current} (requires {required})", .operation.verb())]
pub struct StatusGuardViolation {
    pub operation: Operation,
    pub current: VersionStatus,
    pub required: VersionStatus,
}

impl StatusGuardViolation {
    pub fn new(operation: Operation, current: VersionStatus) -> Self {
        Self {
            operation,
            current,
            required: operation.required_status(),
        }
    }
}

/// Check the status gate for `operation`.
pub fn check_status(operation: Operation, current: VersionStatus) -> Result<(), StatusGuardViolation> {
    if operation.permitted_from(current) {
        Ok(())
    } else {
        Err(StatusGuardViolation::new(operation, current))
    }
}

/// Check that `actor` holds owner/developer/admin capability on `model`.
pub fn check_capability(actor: &Actor, model: &Model, operation: Operation) -> EngineResult<()> {
    capability_gate(actor, model, operation, None)
}

/// Capability check for an operation on an existing version. A denial names
/// the version's status and the status the operation requires.
pub fn check_version_capability(
    actor: &Actor,
    model: &Model,
    version: &ModelVersion,
    operation: Operation,
) -> EngineResult<()> {
    capability_gate(actor, model, operation, Some(version.status))
}

fn capability_gate(
    actor: &Actor,
    model: &Model,
    operation: Operation,
    current: Option<VersionStatus>,
) -> EngineResult<()> {
    let is_owner = actor.id == model.owner_id;
    let is_developer = model.developer_id.as_deref() == Some(actor.id.as_str());

    if actor.is_admin() || is_owner || is_developer {
        Ok(())
    } else {
        Err(EngineError::Permission {
            actor: actor.id.clone(),
            model_id: model.id,
            capability: operation.verb(),
            current,
            required: current.map(|_| operation.required_status()),
        })
    }
}

/// Both gates for an edit or delete of a version.
pub fn check_mutation(
    operation: Operation,
    version: &ModelVersion,
    model: &Model,
    actor: &Actor,
) -> EngineResult<()> {
    check_version_capability(actor, model, version, operation)?;
    check_status(operation, version.status)?;
    Ok(())
}

/// How an activation is allowed to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivationPath {
    /// Normal path: the version was approved by its validation request.
    Validated,
    /// Global-scope version with no validation request, activated from DRAFT.
    /// Only reachable when explicitly enabled.
    Direct,
}

/// Policy inputs for activation that are not part of the permission table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationPolicy {
    /// Permit direct DRAFT → ACTIVE for GLOBAL versions without a validation request.
    pub allow_direct_global_activation: bool,
}

/// Full activation precondition.
///
/// The direct path is a separately validated precondition; it never widens
/// the permission table for versions that have a validation request.
pub fn check_activation(
    version: &ModelVersion,
    model: &Model,
    actor: &Actor,
    policy: ActivationPolicy,
) -> EngineResult<ActivationPath> {
    check_version_capability(actor, model, version, Operation::Activate)?;

    if Operation::Activate.permitted_from(version.status) {
        return Ok(ActivationPath::Validated);
    }

    let direct_eligible = policy.allow_direct_global_activation
        && version.status == VersionStatus::Draft
        && version.scope == DeploymentScope::Global
        && version.validation_request_id.is_none();

    if direct_eligible {
        Ok(ActivationPath::Direct)
    } else {
        Err(StatusGuardViolation::new(Operation::Activate, version.status).into())
    }
}
