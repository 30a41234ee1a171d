//! Status Registry
//!
//! The fixed set of version statuses, validation request statuses,
//! and the per-status permission table consulted by the guard layer.

mod request;
mod version;

pub use request::RequestStatus;
pub use version::{StatusPermissions, VersionStatus};

use thiserror::Error;

/// A status label that does not name any known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: '{label}'")]
pub struct ParseStatusError {
    kind: &'static str,
    label: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
        }
    }
}
