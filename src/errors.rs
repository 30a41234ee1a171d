//! # Engine Errors
//!
//! Error taxonomy shared by every engine component.
//!
//! `InvalidState` and `Permission` are client-facing and carry enough context
//! for the caller to self-diagnose. `Persistence` is server-facing; the
//! enclosing unit of work has already been rolled back when it surfaces.

use thiserror::Error;
use uuid::Uuid;

use crate::guard::StatusGuardViolation;
use crate::status::VersionStatus;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Operation attempted from a status that does not permit it
    #[error("{0}")]
    InvalidState(#[from] StatusGuardViolation),

    /// Actor lacks the capability on the owning model
    #[error(
        "actor '{actor}' lacks {capability} capability on model {model_id}{}",
        status_context(.current, .required)
    )]
    Permission {
        actor: String,
        model_id: Uuid,
        capability: &'static str,
        /// Status of the version acted on, when there is one
        current: Option<VersionStatus>,
        /// Status the operation requires of that version
        required: Option<VersionStatus>,
    },

    /// Storage read or write failed; the unit of work was rolled back
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Malformed input (version number, status label, ...)
    #[error("validation error: {0}")]
    Validation(String),
}

fn status_context(current: &Option<VersionStatus>, required: &Option<VersionStatus>) -> String {
    match (current, required) {
        (Some(current), Some(required)) => {
            format!(" (version status {}, requires {})", current, required)
        }
        _ => String::new(),
    }
}

impl EngineError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn version_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "model version",
            id,
        }
    }

    pub fn request_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "validation request",
            id,
        }
    }

    pub fn model_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "model", id }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "MRM_INVALID_STATE",
            Self::Permission { .. } => "MRM_PERMISSION_DENIED",
            Self::Persistence(_) => "MRM_PERSISTENCE_ERROR",
            Self::NotFound { .. } => "MRM_NOT_FOUND",
            Self::Validation(_) => "MRM_VALIDATION_ERROR",
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidState(_) => 409,
            Self::Permission { .. } => 403,
            Self::Persistence(_) => 500,
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
        }
    }

    /// Client errors are the caller's to fix; retrying unchanged will not help.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<crate::status::ParseStatusError> for EngineError {
    fn from(e: crate::status::ParseStatusError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::Operation;
    use crate::status::VersionStatus;

    #[test]
    fn test_invalid_state_message_names_statuses() {
        let err: EngineError =
            StatusGuardViolation::new(Operation::Activate, VersionStatus::InValidation).into();
        let msg = err.to_string();

        assert!(msg.contains("cannot activate version with status IN_VALIDATION"));
        assert!(msg.contains("APPROVED"));
        assert_eq!(err.status_code(), 409);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_codes_and_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(EngineError::version_not_found(id).status_code(), 404);
        assert_eq!(EngineError::persistence("disk full").code(), "MRM_PERSISTENCE_ERROR");
        assert!(!EngineError::persistence("disk full").is_client_error());

        let perm = EngineError::Permission {
            actor: "mallory".into(),
            model_id: id,
            capability: "activate",
            current: Some(VersionStatus::Draft),
            required: Some(VersionStatus::Approved),
        };
        assert_eq!(perm.status_code(), 403);
        let message = perm.to_string();
        assert!(message.contains("mallory"));
        assert!(message.ends_with("(version status DRAFT, requires APPROVED)"));

        let model_only = EngineError::Permission {
            actor: "mallory".into(),
            model_id: id,
            capability: "edit",
            current: None,
            required: None,
        };
        assert_eq!(
            model_only.to_string(),
            format!("actor 'mallory' lacks edit capability on model {}", id)
        );
    }
}
