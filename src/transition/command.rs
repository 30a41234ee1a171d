//! Status sync command
//!
//! Trigger event in, status changes and audit entries out. Planning is pure
//! and sees only a snapshot of linked versions; applying the plan is the only
//! step that touches the store.

use serde::Serialize;
use uuid::Uuid;

use super::rules::desired_status;
use crate::audit::{AuditAction, AuditEntry, AuditRecorder, EntityType};
use crate::domain::{Actor, ModelVersion};
use crate::errors::EngineResult;
use crate::status::{RequestStatus, VersionStatus};
use crate::store::{points, UnitOfWork};

/// A validation request reaching a new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub request_id: Uuid,
    pub new_status: RequestStatus,
    /// Free text stored on every resulting audit record.
    pub description: String,
    /// Attributed on resulting audit records. Defaults to the system actor.
    pub actor: Actor,
}

impl TriggerEvent {
    pub fn new(request_id: Uuid, new_status: RequestStatus) -> Self {
        Self {
            request_id,
            new_status,
            description: new_status.trigger_description(),
            actor: Actor::system(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }
}

/// One version status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub version_id: Uuid,
    pub old: VersionStatus,
    pub new: VersionStatus,
}

/// Cascade computed for one trigger event.
pub struct StatusSyncCommand<'a> {
    event: &'a TriggerEvent,
}

impl<'a> StatusSyncCommand<'a> {
    pub fn new(event: &'a TriggerEvent) -> Self {
        Self { event }
    }

    /// Compute the changes for a snapshot of the request's linked versions.
    pub fn plan(&self, versions: &[ModelVersion]) -> StatusSyncPlan {
        let mut plan = StatusSyncPlan::default();

        for version in versions {
            match desired_status(self.event.new_status, version.status) {
                Some(next) if next != version.status => {
                    plan.steps.push(PlannedStep {
                        change: StatusChange {
                            version_id: version.id,
                            old: version.status,
                            new: next,
                        },
                        audit: AuditEntry::new(
                            EntityType::ModelVersion,
                            version.id,
                            AuditAction::AutoStatusUpdate,
                        )
                        .with_change(version.status, next)
                        .with_trigger(self.event.description.clone())
                        .with_actor(self.event.actor.id.clone()),
                    });
                }
                _ => plan.unchanged.push(version.id),
            }
        }

        plan
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedStep {
    change: StatusChange,
    audit: AuditEntry,
}

/// Status writes and their audit entries, not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSyncPlan {
    steps: Vec<PlannedStep>,
    unchanged: Vec<Uuid>,
}

impl StatusSyncPlan {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn changes(&self) -> Vec<StatusChange> {
        self.steps.iter().map(|s| s.change).collect()
    }

    pub fn audit_entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.steps.iter().map(|s| &s.audit)
    }

    /// Linked versions the trigger left alone.
    pub fn unchanged(&self) -> &[Uuid] {
        &self.unchanged
    }

    /// Write every change and its audit record inside `uow`.
    pub fn apply(self, uow: &mut dyn UnitOfWork) -> EngineResult<Vec<StatusChange>> {
        let mut applied = Vec::with_capacity(self.steps.len());

        for step in self.steps {
            uow.write_version_status(step.change.version_id, step.change.new)?;
            uow.fail_point(points::TRANSITION_AFTER_STATUS_WRITE)?;
            AuditRecorder::record(uow, step.audit)?;
            applied.push(step.change);
        }

        Ok(applied)
    }
}
