//! Version lifecycle: create, edit, delete, link, and read access

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::WorkflowHooks;
use crate::audit::{
    verify_chain, AuditAction, AuditEntry, AuditRecord, AuditRecorder, ChainVerification, EntityType,
};
use crate::domain::{
    parse_version_number, Actor, ChangeType, DeploymentScope, Model, ModelVersion, ValidationRequest,
    VersionUpdate,
};
use crate::errors::{EngineError, EngineResult};
use crate::guard::{check_capability, check_mutation, Operation};
use crate::observability::{Event, Logger};
use crate::store::{StatusStore, UnitOfWork};
use crate::transition::{report_sync, StatusSyncCommand, TriggerEvent};

/// Input for a new version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewVersion {
    pub model_id: Uuid,
    pub version_number: String,
    pub change_type: ChangeType,
    pub scope: DeploymentScope,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedVersion {
    pub version: ModelVersion,
    /// Validation request created alongside a MAJOR version.
    pub validation_request: Option<ValidationRequest>,
}

impl<S: StatusStore> WorkflowHooks<S> {
    /// Register a model. Models are owned by an external registry; this only
    /// records what the capability check needs.
    pub fn seed_model(&self, model: &Model) -> EngineResult<()> {
        let result = self.store.transact(|uow| uow.insert_model(model));
        self.observed("seed_model", result)
    }

    /// Create a DRAFT version.
    ///
    /// MAJOR changes get a new INTAKE validation request linked in the same
    /// unit of work when `auto_create_validation_for_major` is set.
    pub fn create_version(&self, input: NewVersion, actor: &Actor) -> EngineResult<CreatedVersion> {
        let auto_request = self.settings.auto_create_validation_for_major;

        let result = self.store.transact(|uow| {
            let model = load_model(uow, input.model_id)?;
            check_capability(actor, &model, Operation::Edit)?;

            let mut version = ModelVersion::draft(
                model.id,
                &input.version_number,
                input.change_type,
                input.scope,
                actor.id.clone(),
            )?
            .with_description(input.description.clone());

            let validation_request = if auto_request && version.change_type.requires_validation() {
                let request = ValidationRequest::intake();
                uow.insert_request(&request)?;
                AuditRecorder::record(
                    uow,
                    AuditEntry::new(EntityType::ValidationRequest, request.id, AuditAction::Create)
                        .with_new_value(request.status)
                        .with_trigger(format!("model_version.create -> {}", version.id))
                        .with_actor(actor.id.clone()),
                )?;
                version = version.linked_to(request.id);
                Some(request)
            } else {
                None
            };

            uow.insert_version(&version)?;
            AuditRecorder::record(
                uow,
                AuditEntry::new(EntityType::ModelVersion, version.id, AuditAction::Create)
                    .with_new_value(version.status)
                    .with_trigger("model_version.create")
                    .with_actor(actor.id.clone()),
            )?;

            Ok(CreatedVersion {
                version,
                validation_request,
            })
        });

        let created = self.observed("create_version", result)?;

        let version_id = created.version.id.to_string();
        let model_id = created.version.model_id.to_string();
        let request_id = created.validation_request.as_ref().map(|r| r.id.to_string());
        Logger::info(
            Event::VersionCreated,
            &created_fields(&created.version, &version_id, &model_id, request_id.as_deref()),
        );
        self.metrics.increment_versions_created();

        Ok(created)
    }

    /// Edit a DRAFT version's number, change type or description.
    pub fn update_version(
        &self,
        version_id: Uuid,
        update: &VersionUpdate,
        actor: &Actor,
    ) -> EngineResult<ModelVersion> {
        if update.is_empty() {
            return Err(EngineError::validation("update contains no fields"));
        }

        let result = self.store.transact(|uow| {
            let (mut version, model) = load_version_and_model(uow, version_id)?;
            check_mutation(Operation::Edit, &version, &model, actor)?;

            let before = details(&version);
            if let Some(number) = &update.version_number {
                version.version_number = parse_version_number(number)?;
            }
            if let Some(change_type) = update.change_type {
                version.change_type = change_type;
            }
            if let Some(description) = &update.description {
                version.description = description.clone();
            }

            uow.update_version_details(&version)?;
            AuditRecorder::record(
                uow,
                AuditEntry::new(EntityType::ModelVersion, version.id, AuditAction::Update)
                    .with_change(before, details(&version))
                    .with_trigger("model_version.update")
                    .with_actor(actor.id.clone()),
            )?;
            Ok(version)
        });

        let version = self.observed("update_version", result)?;
        let id = version.id.to_string();
        Logger::info(
            Event::VersionUpdated,
            &[("actor", actor.id.as_str()), ("version_id", id.as_str())],
        );
        Ok(version)
    }

    /// Delete a DRAFT version. Its audit history stays.
    pub fn delete_version(&self, version_id: Uuid, actor: &Actor) -> EngineResult<()> {
        let result = self.store.transact(|uow| {
            let (version, model) = load_version_and_model(uow, version_id)?;
            check_mutation(Operation::Delete, &version, &model, actor)?;

            uow.delete_version(version.id)?;
            AuditRecorder::record(
                uow,
                AuditEntry::new(EntityType::ModelVersion, version.id, AuditAction::Delete)
                    .with_old_value(version.status)
                    .with_trigger("model_version.delete")
                    .with_actor(actor.id.clone()),
            )?;
            Ok(())
        });

        self.observed("delete_version", result)?;
        let id = version_id.to_string();
        Logger::info(
            Event::VersionDeleted,
            &[("actor", actor.id.as_str()), ("version_id", id.as_str())],
        );
        self.metrics.increment_versions_deleted();
        Ok(())
    }

    /// Link a DRAFT version to an existing validation request.
    ///
    /// The version is then synced against the request's current status in
    /// the same unit of work, so linking to an IN_PROGRESS request moves it
    /// to IN_VALIDATION. Other versions on the request are left alone.
    pub fn link_request(&self, version_id: Uuid, request_id: Uuid, actor: &Actor) -> EngineResult<ModelVersion> {
        let result = self.store.transact(|uow| {
            let (version, model) = load_version_and_model(uow, version_id)?;
            check_mutation(Operation::Edit, &version, &model, actor)?;

            let request = uow
                .get_request(request_id)?
                .ok_or_else(|| EngineError::request_not_found(request_id))?;

            uow.link_version(version.id, request_id)?;
            let old = version
                .validation_request_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            AuditRecorder::record(
                uow,
                AuditEntry::new(EntityType::ModelVersion, version.id, AuditAction::Update)
                    .with_change(
                        json!({ "validation_request_id": old }),
                        json!({ "validation_request_id": request_id.to_string() }),
                    )
                    .with_trigger("model_version.link_request")
                    .with_actor(actor.id.clone()),
            )?;

            let event = TriggerEvent::new(request.id, request.status)
                .with_description(format!("model_version.link_request -> {}", request.id))
                .with_actor(actor.clone());
            let linked = version.linked_to(request.id);
            let plan = StatusSyncCommand::new(&event).plan(std::slice::from_ref(&linked));
            let unchanged = plan.unchanged().len();
            let changes = plan.apply(uow)?;

            let synced = uow
                .get_version(linked.id)?
                .ok_or_else(|| EngineError::version_not_found(linked.id))?;
            Ok((synced, changes, unchanged, event))
        });

        let (version, changes, unchanged, event) = self.observed("link_request", result)?;
        report_sync(&self.metrics, &event, &changes, unchanged);
        Ok(version)
    }

    pub fn get_version(&self, version_id: Uuid) -> EngineResult<ModelVersion> {
        self.store.transact(|uow| {
            uow.get_version(version_id)?
                .ok_or_else(|| EngineError::version_not_found(version_id))
        })
    }

    /// Audit history of one entity, oldest first.
    pub fn audit_trail(&self, entity_id: Uuid) -> EngineResult<Vec<AuditRecord>> {
        self.store.transact(|uow| uow.audit_for_entity(entity_id))
    }

    /// Walk the whole audit chain.
    pub fn verify_audit(&self) -> EngineResult<ChainVerification> {
        let records = self.store.transact(|uow| uow.audit_log())?;
        let verification = verify_chain(&records);

        match &verification {
            ChainVerification::Intact { records } => {
                let count = records.to_string();
                Logger::info(Event::AuditChainVerified, &[("records", count.as_str())]);
            }
            ChainVerification::Broken { seq, .. } => {
                let seq = seq.to_string();
                Logger::error(Event::AuditChainBroken, &[("seq", seq.as_str())]);
            }
        }
        Ok(verification)
    }
}

/// Log fields for a created version. The request id is only present for
/// versions that were linked on creation.
fn created_fields<'a>(
    version: &'a ModelVersion,
    version_id: &'a str,
    model_id: &'a str,
    request_id: Option<&'a str>,
) -> Vec<(&'static str, &'a str)> {
    let mut fields = vec![
        ("change_type", version.change_type.as_str()),
        ("model_id", model_id),
    ];
    if let Some(request_id) = request_id {
        fields.push(("validation_request_id", request_id));
    }
    fields.push(("version_id", version_id));
    fields.push(("version_number", version.version_number.as_str()));
    fields
}

fn load_model(uow: &dyn UnitOfWork, model_id: Uuid) -> EngineResult<Model> {
    uow.get_model(model_id)?
        .ok_or_else(|| EngineError::model_not_found(model_id))
}

fn load_version_and_model(uow: &dyn UnitOfWork, version_id: Uuid) -> EngineResult<(ModelVersion, Model)> {
    let version = uow
        .get_version(version_id)?
        .ok_or_else(|| EngineError::version_not_found(version_id))?;
    let model = load_model(uow, version.model_id)?;
    Ok((version, model))
}

/// Editable fields as audited text.
fn details(version: &ModelVersion) -> serde_json::Value {
    json!({
        "version_number": version.version_number,
        "change_type": version.change_type.as_str(),
        "description": version.description,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::observability::MetricsRegistry;
    use crate::status::{RequestStatus, VersionStatus};
    use crate::store::SqliteStore;
    use crate::workflow::WorkflowSettings;

    fn hooks(settings: WorkflowSettings) -> (WorkflowHooks<SqliteStore>, Model) {
        let hooks = WorkflowHooks::new(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            Arc::new(MetricsRegistry::new()),
            settings,
        );
        let model = Model::new("Fraud score", "owner").with_developer("dev");
        hooks.seed_model(&model).unwrap();
        (hooks, model)
    }

    fn input(model: &Model, change_type: ChangeType) -> NewVersion {
        NewVersion {
            model_id: model.id,
            version_number: "v2.0.0".to_string(),
            change_type,
            scope: DeploymentScope::Global,
            description: "retrain on 2025 data".to_string(),
        }
    }

    #[test]
    fn test_major_version_gets_intake_request() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Major), &Actor::user("dev"))
            .unwrap();

        let request = created.validation_request.unwrap();
        assert_eq!(created.version.status, VersionStatus::Draft);
        assert_eq!(created.version.version_number, "2.0.0");
        assert_eq!(created.version.validation_request_id, Some(request.id));

        let trail = hooks.audit_trail(created.version.id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Create);
    }

    #[test]
    fn test_minor_version_has_no_request() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();
        assert!(created.validation_request.is_none());
        assert!(created.version.validation_request_id.is_none());
    }

    #[test]
    fn test_auto_request_can_be_disabled() {
        let (hooks, model) = hooks(WorkflowSettings {
            auto_create_validation_for_major: false,
            ..WorkflowSettings::default()
        });
        let created = hooks
            .create_version(input(&model, ChangeType::Major), &Actor::user("owner"))
            .unwrap();
        assert!(created.validation_request.is_none());
    }

    #[test]
    fn test_create_requires_capability() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let err = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("mallory"))
            .unwrap_err();
        assert_eq!(err.code(), "MRM_PERMISSION_DENIED");
    }

    #[test]
    fn test_update_draft() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();

        let update = VersionUpdate {
            description: Some("fixed typo".to_string()),
            ..VersionUpdate::default()
        };
        let updated = hooks
            .update_version(created.version.id, &update, &Actor::user("dev"))
            .unwrap();
        assert_eq!(updated.description, "fixed typo");
        assert_eq!(hooks.get_version(created.version.id).unwrap().description, "fixed typo");
    }

    #[test]
    fn test_update_rejected_outside_draft() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();
        hooks
            .store()
            .transact(|uow| uow.write_version_status(created.version.id, VersionStatus::Approved))
            .unwrap();

        let update = VersionUpdate {
            description: Some("late change".to_string()),
            ..VersionUpdate::default()
        };
        let err = hooks
            .update_version(created.version.id, &update, &Actor::user("owner"))
            .unwrap_err();
        assert_eq!(err.code(), "MRM_INVALID_STATE");
        assert!(err.to_string().contains("cannot edit version with status APPROVED"));
    }

    #[test]
    fn test_empty_update_rejected() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();
        let err = hooks
            .update_version(created.version.id, &VersionUpdate::default(), &Actor::user("owner"))
            .unwrap_err();
        assert_eq!(err.code(), "MRM_VALIDATION_ERROR");
    }

    #[test]
    fn test_delete_draft_keeps_audit() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();

        hooks.delete_version(created.version.id, &Actor::user("owner")).unwrap();

        assert_eq!(
            hooks.get_version(created.version.id).unwrap_err().code(),
            "MRM_NOT_FOUND"
        );
        let trail = hooks.audit_trail(created.version.id).unwrap();
        assert_eq!(trail.last().map(|r| r.action), Some(AuditAction::Delete));
        assert!(hooks.verify_audit().unwrap().is_intact());
    }

    #[test]
    fn test_link_request() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();
        let request = ValidationRequest::intake();
        hooks.store().transact(|uow| uow.insert_request(&request)).unwrap();

        let linked = hooks
            .link_request(created.version.id, request.id, &Actor::user("owner"))
            .unwrap();
        assert_eq!(linked.validation_request_id, Some(request.id));

        let err = hooks
            .link_request(created.version.id, Uuid::new_v4(), &Actor::user("owner"))
            .unwrap_err();
        assert_eq!(err.code(), "MRM_NOT_FOUND");
    }

    #[test]
    fn test_link_to_in_progress_request_starts_validation() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let owner = Actor::user("owner");
        let major = hooks.create_version(input(&model, ChangeType::Major), &owner).unwrap();
        let request_id = major.validation_request.unwrap().id;
        hooks
            .change_request_status(request_id, RequestStatus::InProgress, &Actor::user("val"), None)
            .unwrap();

        let mut minor_input = input(&model, ChangeType::Minor);
        minor_input.version_number = "2.0.1".to_string();
        let minor = hooks.create_version(minor_input, &owner).unwrap();

        let linked = hooks.link_request(minor.version.id, request_id, &owner).unwrap();
        assert_eq!(linked.status, VersionStatus::InValidation);
        assert_eq!(linked.validation_request_id, Some(request_id));

        let auto: Vec<_> = hooks
            .audit_trail(minor.version.id)
            .unwrap()
            .into_iter()
            .filter(|r| r.action == AuditAction::AutoStatusUpdate)
            .collect();
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].actor, "owner");
        assert!(auto[0].trigger.starts_with("model_version.link_request"));

        // The request can now be approved with both versions in validation.
        let outcome = hooks.approve_request(request_id, &Actor::user("val")).unwrap();
        assert_eq!(outcome.version_changes.len(), 2);
        assert_eq!(hooks.get_version(minor.version.id).unwrap().status, VersionStatus::Approved);
    }

    #[test]
    fn test_link_to_intake_request_leaves_draft() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();
        let request = ValidationRequest::intake();
        hooks.store().transact(|uow| uow.insert_request(&request)).unwrap();

        let linked = hooks
            .link_request(created.version.id, request.id, &Actor::user("owner"))
            .unwrap();
        assert_eq!(linked.status, VersionStatus::Draft);
        assert_eq!(hooks.metrics().snapshot().auto_status_updates, 0);
    }

    #[test]
    fn test_created_fields_omit_missing_request() {
        let (hooks, model) = hooks(WorkflowSettings::default());
        let created = hooks
            .create_version(input(&model, ChangeType::Minor), &Actor::user("owner"))
            .unwrap();
        let fields = created_fields(&created.version, "v", "m", None);
        assert!(fields.iter().all(|(key, _)| *key != "validation_request_id"));

        let fields = created_fields(&created.version, "v", "m", Some("r"));
        assert!(fields.contains(&("validation_request_id", "r")));
    }
}
