//! Validation request hooks and manual activation

use serde::Serialize;
use uuid::Uuid;

use super::WorkflowHooks;
use crate::audit::{AuditAction, AuditEntry, AuditRecorder, EntityType};
use crate::domain::{Actor, ValidationRequest};
use crate::errors::{EngineError, EngineResult};
use crate::guard::{check_status, Operation};
use crate::observability::{Event, Logger};
use crate::status::RequestStatus;
use crate::store::{points, StatusStore, UnitOfWork};
use crate::supersession::ActivationOutcome;
use crate::transition::{report_sync, StatusChange, TransitionEngine, TriggerEvent};

/// Result of a committed request status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestStatusOutcome {
    pub request_id: Uuid,
    pub old_status: RequestStatus,
    pub new_status: RequestStatus,
    /// Linked versions whose status changed as a consequence.
    pub version_changes: Vec<StatusChange>,
}

impl<S: StatusStore> WorkflowHooks<S> {
    /// Set a validation request's status and sync its linked versions.
    ///
    /// Setting the status a request already has still runs the engine, which
    /// is a no-op for versions already in their target status.
    pub fn change_request_status(
        &self,
        request_id: Uuid,
        new_status: RequestStatus,
        actor: &Actor,
        trigger: Option<&str>,
    ) -> EngineResult<RequestStatusOutcome> {
        let mut event = TriggerEvent::new(request_id, new_status).with_actor(actor.clone());
        if let Some(trigger) = trigger {
            event = event.with_description(trigger);
        }
        self.sync_request("change_request_status", event, |_, _| Ok(()))
    }

    /// Decline (cancel) a validation request.
    pub fn decline_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        reason: Option<&str>,
    ) -> EngineResult<RequestStatusOutcome> {
        let description = match reason {
            Some(reason) => format!("validation_request.decline -> CANCELLED ({})", reason),
            None => "validation_request.decline -> CANCELLED".to_string(),
        };
        let event = TriggerEvent::new(request_id, RequestStatus::Cancelled)
            .with_description(description)
            .with_actor(actor.clone());
        self.sync_request("decline_request", event, |_, _| Ok(()))
    }

    /// Approve a validation request.
    ///
    /// Strict: every linked version must currently accept approval, otherwise
    /// nothing is written and the first offending version is reported.
    /// Approving an already APPROVED request is a no-op.
    pub fn approve_request(&self, request_id: Uuid, actor: &Actor) -> EngineResult<RequestStatusOutcome> {
        let event = TriggerEvent::new(request_id, RequestStatus::Approved).with_actor(actor.clone());
        self.sync_request("approve_request", event, |uow, request| {
            if request.status == RequestStatus::Approved {
                return Ok(());
            }
            for version in uow.get_versions_by_request(request_id)? {
                check_status(Operation::Approve, version.status)?;
            }
            Ok(())
        })
    }

    /// Manually activate an approved version.
    pub fn activate_version(&self, version_id: Uuid, actor: &Actor) -> EngineResult<ActivationOutcome> {
        self.coordinator.activate(version_id, actor)
    }

    fn sync_request<F>(
        &self,
        operation: &str,
        event: TriggerEvent,
        precheck: F,
    ) -> EngineResult<RequestStatusOutcome>
    where
        F: FnOnce(&dyn UnitOfWork, &ValidationRequest) -> EngineResult<()>,
    {
        let result = self.store.transact(|uow| {
            let request = uow
                .get_request(event.request_id)?
                .ok_or_else(|| EngineError::request_not_found(event.request_id))?;

            precheck(&*uow, &request)?;

            if request.status != event.new_status {
                uow.write_request_status(request.id, event.new_status)?;
                AuditRecorder::record(
                    uow,
                    AuditEntry::new(
                        EntityType::ValidationRequest,
                        request.id,
                        AuditAction::ManualStatusUpdate,
                    )
                    .with_change(request.status, event.new_status)
                    .with_trigger(event.description.clone())
                    .with_actor(event.actor.id.clone()),
                )?;
            }
            uow.fail_point(points::WORKFLOW_AFTER_REQUEST_WRITE)?;

            let (version_changes, unchanged) = TransitionEngine::<S>::apply_in(uow, &event)?;
            Ok((
                RequestStatusOutcome {
                    request_id: request.id,
                    old_status: request.status,
                    new_status: event.new_status,
                    version_changes,
                },
                unchanged,
            ))
        });

        let (outcome, unchanged) = self.observed(operation, result)?;

        if outcome.old_status != outcome.new_status {
            let request_id = outcome.request_id.to_string();
            Logger::info(
                Event::RequestStatusChanged,
                &[
                    ("actor", event.actor.id.as_str()),
                    ("new_status", outcome.new_status.as_str()),
                    ("old_status", outcome.old_status.as_str()),
                    ("request_id", request_id.as_str()),
                ],
            );
            self.metrics.increment_request_status_changes();
        }
        report_sync(&self.metrics, &event, &outcome.version_changes, unchanged);

        Ok(outcome)
    }
}
