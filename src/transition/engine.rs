//! Transition Engine
//!
//! Derives model version statuses from validation request statuses. Stateless
//! over the store: every invocation is one unit of work, and re-applying the
//! same trigger changes nothing.

use std::sync::Arc;

use uuid::Uuid;

use super::command::{StatusChange, StatusSyncCommand, TriggerEvent};
use crate::errors::EngineResult;
use crate::observability::{observe_failure, Event, Logger, MetricsRegistry};
use crate::status::RequestStatus;
use crate::store::{StatusStore, UnitOfWork};

pub struct TransitionEngine<S> {
    store: Arc<S>,
    metrics: Arc<MetricsRegistry>,
}

impl<S: StatusStore> TransitionEngine<S> {
    pub fn new(store: Arc<S>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { store, metrics }
    }

    /// Apply a request status change as the system actor.
    ///
    /// Returns the versions whose status actually changed. A request with no
    /// linked versions yields an empty list.
    pub fn apply_validation_status_change(
        &self,
        request_id: Uuid,
        new_status: RequestStatus,
        trigger: &str,
    ) -> EngineResult<Vec<StatusChange>> {
        self.apply_event(TriggerEvent::new(request_id, new_status).with_description(trigger))
    }

    /// Apply a trigger event in its own unit of work.
    pub fn apply_event(&self, event: TriggerEvent) -> EngineResult<Vec<StatusChange>> {
        match self.store.transact(|uow| Self::apply_in(uow, &event)) {
            Ok((changes, unchanged)) => {
                report_sync(&self.metrics, &event, &changes, unchanged);
                Ok(changes)
            }
            Err(e) => {
                observe_failure(&self.metrics, "apply_validation_status_change", &e);
                Err(e)
            }
        }
    }

    /// Apply a trigger event inside an existing unit of work.
    ///
    /// Returns the changes and the number of linked versions left unchanged.
    /// Nothing is logged; the caller reports once its unit of work commits.
    pub fn apply_in(
        uow: &mut dyn UnitOfWork,
        event: &TriggerEvent,
    ) -> EngineResult<(Vec<StatusChange>, usize)> {
        let versions = uow.get_versions_by_request(event.request_id)?;
        let plan = StatusSyncCommand::new(event).plan(&versions);
        let unchanged = plan.unchanged().len();
        Ok((plan.apply(uow)?, unchanged))
    }
}

/// Log and count a committed sync.
pub(crate) fn report_sync(
    metrics: &MetricsRegistry,
    event: &TriggerEvent,
    changes: &[StatusChange],
    unchanged: usize,
) {
    let request_id = event.request_id.to_string();

    for change in changes {
        let version_id = change.version_id.to_string();
        Logger::info(
            Event::AutoStatusUpdate,
            &[
                ("new_status", change.new.as_str()),
                ("old_status", change.old.as_str()),
                ("request_id", request_id.as_str()),
                ("trigger", event.description.as_str()),
                ("version_id", version_id.as_str()),
            ],
        );
    }
    metrics.add_auto_status_updates(changes.len() as u64);

    if changes.is_empty() {
        let unchanged_count = unchanged.to_string();
        Logger::trace(
            Event::TransitionNoop,
            &[
                ("request_id", request_id.as_str()),
                ("request_status", event.new_status.as_str()),
                ("unchanged", unchanged_count.as_str()),
            ],
        );
        metrics.add_transition_noops(1);
    }
}
