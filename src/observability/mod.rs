//! Observability
//!
//! Structured JSON logging, typed events and atomic counters. Observability
//! is read-only: nothing here influences a unit of work's outcome, and
//! everything is reported after commit or rollback.
//!
//! ```ignore
//! use mrm_status::observability::{Event, Logger, MetricsRegistry};
//!
//! Logger::info(Event::VersionActivated, &[("version_id", "...")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_activations();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

use crate::errors::EngineError;

/// Log and count a failed operation.
///
/// Guard rejections are logged at WARN, storage failures at ERROR. Not-found
/// and malformed input are the caller's business and only logged at TRACE.
pub fn observe_failure(metrics: &MetricsRegistry, operation: &str, err: &EngineError) {
    let message = err.to_string();
    let fields = [
        ("code", err.code()),
        ("error", message.as_str()),
        ("operation", operation),
    ];

    match err {
        EngineError::InvalidState(_) | EngineError::Permission { .. } => {
            metrics.increment_guard_denials();
            Logger::warn(Event::GuardDenied, &fields);
        }
        EngineError::Persistence(_) => {
            metrics.increment_persistence_failures();
            Logger::error(Event::PersistenceFailure, &fields);
        }
        EngineError::NotFound { .. } | EngineError::Validation(_) => {
            Logger::trace(Event::GuardDenied, &fields);
        }
    }
}
