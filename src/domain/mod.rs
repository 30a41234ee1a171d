//! Domain entities
//!
//! ModelVersion –(0..1)→ ValidationRequest; ValidationRequest –(0..n)→ ModelVersion.
//! The link lives on the version side only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};
use crate::status::{RequestStatus, VersionStatus};

/// Change classification of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Minor,
    Major,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
        }
    }

    /// Major changes get a validation request created alongside the version.
    pub fn requires_validation(&self) -> bool {
        matches!(self, Self::Major)
    }
}

impl FromStr for ChangeType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MINOR" => Ok(Self::Minor),
            "MAJOR" => Ok(Self::Major),
            other => Err(EngineError::validation(format!("unknown change type: '{}'", other))),
        }
    }
}

/// Deployment scope of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentScope {
    Global,
    Regional,
}

impl DeploymentScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "GLOBAL",
            Self::Regional => "REGIONAL",
        }
    }
}

impl FromStr for DeploymentScope {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GLOBAL" => Ok(Self::Global),
            "REGIONAL" => Ok(Self::Regional),
            other => Err(EngineError::validation(format!("unknown deployment scope: '{}'", other))),
        }
    }
}

/// A tracked risk model. Only the fields the capability check needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: Uuid,
    pub name: String,
    pub owner_id: String,
    pub developer_id: Option<String>,
}

impl Model {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id: owner_id.into(),
            developer_id: None,
        }
    }

    pub fn with_developer(mut self, developer_id: impl Into<String>) -> Self {
        self.developer_id = Some(developer_id.into());
        self
    }
}

/// One revision of a model's artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: Uuid,
    pub model_id: Uuid,
    pub version_number: String,
    pub change_type: ChangeType,
    pub scope: DeploymentScope,
    pub description: String,
    pub status: VersionStatus,
    pub validation_request_id: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ModelVersion {
    /// Build a new DRAFT version. The version number must be a semantic version.
    pub fn draft(
        model_id: Uuid,
        version_number: &str,
        change_type: ChangeType,
        scope: DeploymentScope,
        created_by: impl Into<String>,
    ) -> EngineResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            model_id,
            version_number: parse_version_number(version_number)?,
            change_type,
            scope,
            description: String::new(),
            status: VersionStatus::Draft,
            validation_request_id: None,
            created_by: created_by.into(),
            created_at: Utc::now(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn linked_to(mut self, request_id: Uuid) -> Self {
        self.validation_request_id = Some(request_id);
        self
    }
}

/// Validate and normalize a semantic version number.
pub fn parse_version_number(raw: &str) -> EngineResult<String> {
    let trimmed = raw.trim().trim_start_matches('v');
    semver::Version::parse(trimmed)
        .map(|v| v.to_string())
        .map_err(|e| EngineError::validation(format!("invalid version number '{}': {}", raw, e)))
}

/// A unit of validation work referenced by one or more versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub id: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl ValidationRequest {
    /// New request in INTAKE.
    pub fn intake() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: RequestStatus::Intake,
            created_at: Utc::now(),
        }
    }
}

/// Fields a DRAFT version may have edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersionUpdate {
    #[serde(default)]
    pub version_number: Option<String>,
    #[serde(default)]
    pub change_type: Option<ChangeType>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VersionUpdate {
    pub fn is_empty(&self) -> bool {
        self.version_number.is_none() && self.change_type.is_none() && self.description.is_none()
    }
}

/// Role carried by a caller. Authentication itself happens upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The engine itself, for automatic transitions.
    System,
    Admin,
    User,
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(EngineError::validation(format!("unknown role: '{}'", other))),
        }
    }
}

/// Identity attributed to a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    pub fn system() -> Self {
        Self {
            id: Self::SYSTEM_ID.to_string(),
            role: Role::System,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
