//! Audit Recorder
//!
//! Append-only, hash-chained record of every automatic or manual status change.
//!
//! - Records are created only by [`AuditRecorder`]
//! - The store rejects UPDATE and DELETE on the audit table
//! - An unaudited status change is never committed

mod chain;
mod record;
mod recorder;

pub use chain::{verify_chain, ChainBreak, ChainVerification};
pub use record::{format_timestamp, AuditAction, AuditEntry, AuditRecord, EntityType, GENESIS_HASH};
pub use recorder::AuditRecorder;
