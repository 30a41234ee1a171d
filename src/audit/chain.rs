//! Audit chain verification
//!
//! Walks the log in sequence order and reports the first record whose own
//! hash or link to its predecessor does not hold.

use serde::Serialize;

use super::record::{AuditRecord, GENESIS_HASH};

/// Outcome of verifying the audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChainVerification {
    /// Every record links to its predecessor and hashes correctly.
    Intact { records: usize },

    /// First broken record.
    Broken { seq: i64, reason: ChainBreak },
}

impl ChainVerification {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreak {
    /// Stored hash does not match the record's content.
    HashMismatch,
    /// `prev_hash` does not match the preceding record's hash.
    LinkMismatch,
}

/// Verify records already sorted by `seq`.
pub fn verify_chain(records: &[AuditRecord]) -> ChainVerification {
    let mut expected_prev = GENESIS_HASH;

    for record in records {
        if record.prev_hash != expected_prev {
            return ChainVerification::Broken {
                seq: record.seq,
                reason: ChainBreak::LinkMismatch,
            };
        }
        if !record.is_self_consistent() {
            return ChainVerification::Broken {
                seq: record.seq,
                reason: ChainBreak::HashMismatch,
            };
        }
        expected_prev = record.hash.as_str();
    }

    ChainVerification::Intact {
        records: records.len(),
    }
}
