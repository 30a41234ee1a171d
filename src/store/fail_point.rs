//! Fail point injection for atomicity testing
//!
//! A fail point is a named location inside a unit of work. When armed, reaching
//! it returns a persistence error, which rolls back everything the unit of work
//! wrote so far.
//!
//! Points are armed programmatically ([`FailPoints::arm`]) or at startup via the
//! `MRM_FAIL_POINT` environment variable (comma separated).
//!
//! ```bash
//! MRM_FAIL_POINT=activate_after_demote mrm-status activate ...
//! ```

use std::collections::HashSet;
use std::sync::Mutex;

use crate::errors::{EngineError, EngineResult};

/// Environment variable read by [`FailPoints::from_env`].
pub const FAIL_POINT_ENV: &str = "MRM_FAIL_POINT";

/// All defined fail point names
pub mod points {
    /// After a version status write, before its audit record.
    pub const TRANSITION_AFTER_STATUS_WRITE: &str = "transition_after_status_write";
    /// After the previous ACTIVE version is demoted, before the new one is promoted.
    pub const ACTIVATE_AFTER_DEMOTE: &str = "activate_after_demote";
    /// After a validation request status write, before the transition engine runs.
    pub const WORKFLOW_AFTER_REQUEST_WRITE: &str = "workflow_after_request_write";
    /// Inside the audit recorder, before the record is appended.
    pub const AUDIT_BEFORE_APPEND: &str = "audit_before_append";

    /// Get all fail point names
    pub fn all() -> &'static [&'static str] {
        &[
            TRANSITION_AFTER_STATUS_WRITE,
            ACTIVATE_AFTER_DEMOTE,
            WORKFLOW_AFTER_REQUEST_WRITE,
            AUDIT_BEFORE_APPEND,
        ]
    }
}

/// Set of armed fail points.
#[derive(Debug, Default)]
pub struct FailPoints {
    armed: Mutex<HashSet<String>>,
}

impl FailPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the points listed in `MRM_FAIL_POINT`.
    pub fn from_env() -> Self {
        let points = Self::new();
        if let Ok(value) = std::env::var(FAIL_POINT_ENV) {
            for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                points.arm(name);
            }
        }
        points
    }

    pub fn arm(&self, name: &str) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.insert(name.to_string());
        }
    }

    pub fn disarm(&self, name: &str) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.remove(name);
        }
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.armed
            .lock()
            .map(|armed| armed.contains(name))
            .unwrap_or(false)
    }

    /// Fail with a persistence error if `name` is armed.
    pub fn check(&self, name: &str) -> EngineResult<()> {
        if self.is_armed(name) {
            Err(EngineError::persistence(format!("injected failure at fail point '{}'", name)))
        } else {
            Ok(())
        }
    }
}
