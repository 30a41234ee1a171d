//! Audit Recorder
//!
//! The only writer of audit records. Appends happen inside the caller's unit
//! of work, so a failed append rolls back the status change it describes.

use chrono::Utc;

use super::record::{AuditEntry, AuditRecord, GENESIS_HASH};
use crate::errors::EngineResult;
use crate::store::{points, UnitOfWork};

/// Chains and appends audit entries.
pub struct AuditRecorder;

impl AuditRecorder {
    /// Chain `entry` onto the current log head and append it.
    ///
    /// Never fails silently: any error propagates and must abort the
    /// enclosing unit of work.
    pub fn record(uow: &mut dyn UnitOfWork, entry: AuditEntry) -> EngineResult<AuditRecord> {
        let prev_hash = uow
            .last_audit_hash()?
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut record = entry.seal(&prev_hash, Utc::now());

        uow.fail_point(points::AUDIT_BEFORE_APPEND)?;
        record.seq = uow.append_audit(&record)?;

        Ok(record)
    }
}
