//! Audit records
//!
//! Every record MUST include: entity type, entity id, action, old value,
//! new value, trigger, actor, timestamp. Records are immutable once appended.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::EngineError;

/// Hash used as `prev_hash` for the first record of the log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Kind of entity an audit record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    ModelVersion,
    ValidationRequest,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::ModelVersion => "MODEL_VERSION",
            EntityType::ValidationRequest => "VALIDATION_REQUEST",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MODEL_VERSION" => Ok(EntityType::ModelVersion),
            "VALIDATION_REQUEST" => Ok(EntityType::ValidationRequest),
            other => Err(EngineError::validation(format!("unknown entity type: '{}'", other))),
        }
    }
}

/// Audit action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Status derived by the transition engine from a validation request.
    AutoStatusUpdate,

    /// Status set by an explicit user action (activation, supersession,
    /// request status change).
    ManualStatusUpdate,

    /// Entity created.
    Create,

    /// Non-status fields edited.
    Update,

    /// Entity deleted.
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AutoStatusUpdate => "AUTO_STATUS_UPDATE",
            AuditAction::ManualStatusUpdate => "MANUAL_STATUS_UPDATE",
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO_STATUS_UPDATE" => Ok(AuditAction::AutoStatusUpdate),
            "MANUAL_STATUS_UPDATE" => Ok(AuditAction::ManualStatusUpdate),
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            other => Err(EngineError::validation(format!("unknown audit action: '{}'", other))),
        }
    }
}

/// A record not yet chained or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub trigger: String,
    pub actor: String,
}

impl AuditEntry {
    pub fn new(entity_type: EntityType, entity_id: Uuid, action: AuditAction) -> Self {
        Self {
            entity_type,
            entity_id,
            action,
            old_value: None,
            new_value: None,
            trigger: String::new(),
            actor: String::new(),
        }
    }

    /// Set old/new values.
    pub fn with_change(mut self, old: impl ToString, new: impl ToString) -> Self {
        self.old_value = Some(old.to_string());
        self.new_value = Some(new.to_string());
        self
    }

    pub fn with_new_value(mut self, new: impl ToString) -> Self {
        self.new_value = Some(new.to_string());
        self
    }

    pub fn with_old_value(mut self, old: impl ToString) -> Self {
        self.old_value = Some(old.to_string());
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Seal into a chained record following `prev_hash`.
    pub fn seal(self, prev_hash: &str, timestamp: DateTime<Utc>) -> AuditRecord {
        let mut record = AuditRecord {
            seq: 0,
            id: Uuid::new_v4(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action,
            old_value: self.old_value,
            new_value: self.new_value,
            trigger: self.trigger,
            actor: self.actor,
            timestamp: format_timestamp(timestamp),
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
        };
        record.hash = record.compute_hash();
        record
    }
}

/// An immutable, hash-chained audit fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the log, assigned by the store on append.
    pub seq: i64,
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub trigger: String,
    pub actor: String,
    /// RFC 3339, microsecond precision, UTC.
    pub timestamp: String,
    pub prev_hash: String,
    pub hash: String,
}

impl AuditRecord {
    /// SHA-256 over `prev_hash` and every content field.
    ///
    /// `seq` is excluded: it is assigned on append.
    pub fn compute_hash(&self) -> String {
        let id = self.id.to_string();
        let entity_id = self.entity_id.to_string();
        let mut hasher = Sha256::new();
        for field in [
            self.prev_hash.as_str(),
            id.as_str(),
            self.entity_type.as_str(),
            entity_id.as_str(),
            self.action.as_str(),
            self.old_value.as_deref().unwrap_or(""),
            self.new_value.as_deref().unwrap_or(""),
            self.trigger.as_str(),
            self.actor.as_str(),
            self.timestamp.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        to_hex(&hasher.finalize())
    }

    /// Check the record's own hash.
    pub fn is_self_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

/// Fixed-precision timestamp so the hashed text round-trips through storage.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
