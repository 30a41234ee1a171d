//! Workflow hooks
//!
//! The entry points the surrounding validation workflow calls. Each hook is
//! one unit of work: the workflow's own write (request status, version row)
//! and every status change it cascades into commit or roll back together.
//!
//! - Request status change (manual or automatic) -> transition engine
//! - Decline -> transition engine with CANCELLED
//! - Approval -> strict guard on linked versions, then transition engine
//! - Manual activation -> supersession coordinator
//! - Version create/update/delete/link -> guard layer

mod hooks;
mod versions;

pub use hooks::RequestStatusOutcome;
pub use versions::{CreatedVersion, NewVersion};

use std::sync::Arc;

use crate::errors::EngineResult;
use crate::guard::ActivationPolicy;
use crate::observability::{observe_failure, MetricsRegistry};
use crate::store::StatusStore;
use crate::supersession::SupersessionCoordinator;
use crate::transition::TransitionEngine;

/// Workflow behavior switches, usually taken from the engine config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub auto_create_validation_for_major: bool,
    pub activation: ActivationPolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            auto_create_validation_for_major: true,
            activation: ActivationPolicy::default(),
        }
    }
}

pub struct WorkflowHooks<S> {
    store: Arc<S>,
    metrics: Arc<MetricsRegistry>,
    engine: TransitionEngine<S>,
    coordinator: SupersessionCoordinator<S>,
    settings: WorkflowSettings,
}

impl<S: StatusStore> WorkflowHooks<S> {
    pub fn new(store: Arc<S>, metrics: Arc<MetricsRegistry>, settings: WorkflowSettings) -> Self {
        Self {
            engine: TransitionEngine::new(Arc::clone(&store), Arc::clone(&metrics)),
            coordinator: SupersessionCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&metrics),
                settings.activation,
            ),
            store,
            metrics,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn engine(&self) -> &TransitionEngine<S> {
        &self.engine
    }

    pub fn settings(&self) -> WorkflowSettings {
        self.settings
    }

    fn observed<T>(&self, operation: &str, result: EngineResult<T>) -> EngineResult<T> {
        if let Err(e) = &result {
            observe_failure(&self.metrics, operation, e);
        }
        result
    }
}
