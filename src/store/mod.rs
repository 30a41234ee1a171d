//! Persistence Gateway
//!
//! Atomic read-modify-write of version statuses and the audit log.
//!
//! Every multi-step sequence runs inside one [`UnitOfWork`] obtained from
//! [`StatusStore::transact`]. A unit of work commits only if the closure
//! returns `Ok`; any error rolls back everything it wrote.
//!
//! The gateway exposes no business rules of its own. The one invariant it
//! enforces structurally (at most one ACTIVE version per model) is held by a
//! unique index, not by application code.

mod fail_point;
mod schema;
mod sqlite;

pub use fail_point::{points, FailPoints, FAIL_POINT_ENV};
pub use schema::SINGLE_ACTIVE_INDEX;
pub use sqlite::{SqliteStore, SqliteUnitOfWork};

use uuid::Uuid;

use crate::audit::AuditRecord;
use crate::domain::{Model, ModelVersion, ValidationRequest};
use crate::errors::EngineResult;
use crate::status::{RequestStatus, VersionStatus};

/// Operations available inside one atomic unit of work.
pub trait UnitOfWork {
    // ==================
    // Versions
    // ==================

    fn get_version(&self, id: Uuid) -> EngineResult<Option<ModelVersion>>;

    /// All versions linked to a validation request.
    fn get_versions_by_request(&self, request_id: Uuid) -> EngineResult<Vec<ModelVersion>>;

    /// The model's ACTIVE version, if any.
    fn get_active_version(&self, model_id: Uuid) -> EngineResult<Option<ModelVersion>>;

    fn get_versions_by_model(&self, model_id: Uuid) -> EngineResult<Vec<ModelVersion>>;

    /// Set a version's status. Fails with `NotFound` if the version is missing.
    fn write_version_status(&mut self, id: Uuid, status: VersionStatus) -> EngineResult<()>;

    fn insert_version(&mut self, version: &ModelVersion) -> EngineResult<()>;

    /// Persist version number, change type and description.
    fn update_version_details(&mut self, version: &ModelVersion) -> EngineResult<()>;

    fn link_version(&mut self, version_id: Uuid, request_id: Uuid) -> EngineResult<()>;

    fn delete_version(&mut self, id: Uuid) -> EngineResult<()>;

    // ==================
    // Models and requests
    // ==================

    fn get_model(&self, id: Uuid) -> EngineResult<Option<Model>>;

    fn insert_model(&mut self, model: &Model) -> EngineResult<()>;

    fn get_request(&self, id: Uuid) -> EngineResult<Option<ValidationRequest>>;

    fn insert_request(&mut self, request: &ValidationRequest) -> EngineResult<()>;

    fn write_request_status(&mut self, id: Uuid, status: RequestStatus) -> EngineResult<()>;

    // ==================
    // Audit log
    // ==================

    /// Hash of the most recent audit record.
    fn last_audit_hash(&self) -> EngineResult<Option<String>>;

    /// Append a sealed record; returns its sequence number.
    fn append_audit(&mut self, record: &AuditRecord) -> EngineResult<i64>;

    fn audit_for_entity(&self, entity_id: Uuid) -> EngineResult<Vec<AuditRecord>>;

    /// Whole log in sequence order.
    fn audit_log(&self) -> EngineResult<Vec<AuditRecord>>;

    // ==================
    // Testing
    // ==================

    /// Fail if the named fail point is armed.
    fn fail_point(&self, name: &str) -> EngineResult<()>;
}

/// A transactional store.
pub trait StatusStore: Send + Sync {
    /// Run `f` in one atomic, serialized unit of work.
    fn transact<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> EngineResult<T>;
}
