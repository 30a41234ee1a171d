//! Supersession Coordinator
//!
//! Activation is all-or-nothing: demote the model's current ACTIVE version,
//! promote the target, and audit both, inside one unit of work. There is no
//! intermediate committed state with zero or two ACTIVE versions.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEntry, AuditRecorder, EntityType};
use crate::domain::Actor;
use crate::errors::{EngineError, EngineResult};
use crate::guard::{check_activation, ActivationPath, ActivationPolicy};
use crate::observability::{observe_failure, Event, Logger, MetricsRegistry};
use crate::status::VersionStatus;
use crate::store::{points, StatusStore, UnitOfWork};
use crate::transition::StatusChange;

/// Result of a committed activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationOutcome {
    pub model_id: Uuid,
    pub activated: StatusChange,
    /// Previous ACTIVE version, now SUPERSEDED.
    pub demoted: Option<StatusChange>,
    pub path: ActivationPath,
}

pub struct SupersessionCoordinator<S> {
    store: Arc<S>,
    metrics: Arc<MetricsRegistry>,
    policy: ActivationPolicy,
}

impl<S: StatusStore> SupersessionCoordinator<S> {
    pub fn new(store: Arc<S>, metrics: Arc<MetricsRegistry>, policy: ActivationPolicy) -> Self {
        Self {
            store,
            metrics,
            policy,
        }
    }

    /// Activate `version_id` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the version or its model is missing
    /// - `Permission` if the actor is not owner, developer or admin
    /// - `InvalidState` if the version is not APPROVED (and not eligible for
    ///   direct activation)
    /// - `Persistence` on any write failure; nothing is committed
    pub fn activate(&self, version_id: Uuid, actor: &Actor) -> EngineResult<ActivationOutcome> {
        let policy = self.policy;
        match self
            .store
            .transact(|uow| Self::activate_in(uow, version_id, actor, policy))
        {
            Ok(outcome) => {
                report_activation(&self.metrics, &outcome, actor);
                Ok(outcome)
            }
            Err(e) => {
                observe_failure(&self.metrics, "activate", &e);
                Err(e)
            }
        }
    }

    /// Activation steps inside an existing unit of work.
    pub fn activate_in(
        uow: &mut dyn UnitOfWork,
        version_id: Uuid,
        actor: &Actor,
        policy: ActivationPolicy,
    ) -> EngineResult<ActivationOutcome> {
        let version = uow
            .get_version(version_id)?
            .ok_or_else(|| EngineError::version_not_found(version_id))?;
        let model = uow
            .get_model(version.model_id)?
            .ok_or_else(|| EngineError::model_not_found(version.model_id))?;

        let path = check_activation(&version, &model, actor, policy)?;
        let trigger = format!("model_version.activate -> {}", version.id);

        let demoted = match uow.get_active_version(model.id)? {
            Some(current) if current.id != version.id => {
                uow.write_version_status(current.id, VersionStatus::Superseded)?;
                AuditRecorder::record(
                    uow,
                    AuditEntry::new(
                        EntityType::ModelVersion,
                        current.id,
                        AuditAction::ManualStatusUpdate,
                    )
                    .with_change(current.status, VersionStatus::Superseded)
                    .with_trigger(trigger.clone())
                    .with_actor(actor.id.clone()),
                )?;
                Some(StatusChange {
                    version_id: current.id,
                    old: current.status,
                    new: VersionStatus::Superseded,
                })
            }
            _ => None,
        };

        uow.fail_point(points::ACTIVATE_AFTER_DEMOTE)?;

        // The single-active index rejects this write if another ACTIVE row
        // slipped in; the whole unit of work then rolls back.
        uow.write_version_status(version.id, VersionStatus::Active)?;
        AuditRecorder::record(
            uow,
            AuditEntry::new(
                EntityType::ModelVersion,
                version.id,
                AuditAction::ManualStatusUpdate,
            )
            .with_change(version.status, VersionStatus::Active)
            .with_trigger(trigger)
            .with_actor(actor.id.clone()),
        )?;

        Ok(ActivationOutcome {
            model_id: model.id,
            activated: StatusChange {
                version_id: version.id,
                old: version.status,
                new: VersionStatus::Active,
            },
            demoted,
            path,
        })
    }
}

fn report_activation(metrics: &MetricsRegistry, outcome: &ActivationOutcome, actor: &Actor) {
    let model_id = outcome.model_id.to_string();
    let version_id = outcome.activated.version_id.to_string();
    let path = match outcome.path {
        ActivationPath::Validated => "validated",
        ActivationPath::Direct => "direct",
    };

    if let Some(demoted) = &outcome.demoted {
        let demoted_id = demoted.version_id.to_string();
        Logger::info(
            Event::VersionSuperseded,
            &[
                ("model_id", model_id.as_str()),
                ("superseded_by", version_id.as_str()),
                ("version_id", demoted_id.as_str()),
            ],
        );
        metrics.increment_supersessions();
    }

    Logger::info(
        Event::VersionActivated,
        &[
            ("actor", actor.id.as_str()),
            ("model_id", model_id.as_str()),
            ("old_status", outcome.activated.old.as_str()),
            ("path", path),
            ("version_id", version_id.as_str()),
        ],
    );
    metrics.increment_activations();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeType, DeploymentScope, Model, ModelVersion};
    use crate::store::SqliteStore;

    struct Fixture {
        store: Arc<SqliteStore>,
        coordinator: SupersessionCoordinator<SqliteStore>,
        model: Model,
    }

    fn fixture(policy: ActivationPolicy) -> Fixture {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let model = Model::new("IFRS9 PD", "owner").with_developer("dev");
        store.transact(|uow| uow.insert_model(&model)).unwrap();
        let coordinator =
            SupersessionCoordinator::new(Arc::clone(&store), Arc::new(MetricsRegistry::new()), policy);
        Fixture {
            store,
            coordinator,
            model,
        }
    }

    fn insert(f: &Fixture, number: &str, status: VersionStatus) -> Uuid {
        let mut v =
            ModelVersion::draft(f.model.id, number, ChangeType::Minor, DeploymentScope::Global, "owner")
                .unwrap();
        v.status = status;
        f.store.transact(|uow| uow.insert_version(&v)).unwrap();
        v.id
    }

    fn status_of(f: &Fixture, id: Uuid) -> VersionStatus {
        f.store.transact(|uow| uow.get_version(id)).unwrap().unwrap().status
    }

    #[test]
    fn test_activate_first_version() {
        let f = fixture(ActivationPolicy::default());
        let a = insert(&f, "1.0.0", VersionStatus::Approved);

        let outcome = f.coordinator.activate(a, &Actor::user("owner")).unwrap();
        assert_eq!(outcome.activated.new, VersionStatus::Active);
        assert!(outcome.demoted.is_none());
        assert_eq!(outcome.path, ActivationPath::Validated);
        assert_eq!(status_of(&f, a), VersionStatus::Active);
    }

    #[test]
    fn test_activation_supersedes_previous() {
        let f = fixture(ActivationPolicy::default());
        let a = insert(&f, "1.0.0", VersionStatus::Active);
        let b = insert(&f, "2.0.0", VersionStatus::Approved);

        let outcome = f.coordinator.activate(b, &Actor::user("dev")).unwrap();
        assert_eq!(outcome.demoted.map(|d| d.version_id), Some(a));
        assert_eq!(status_of(&f, a), VersionStatus::Superseded);
        assert_eq!(status_of(&f, b), VersionStatus::Active);

        let log = f.store.transact(|uow| uow.audit_log()).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|r| r.action == AuditAction::ManualStatusUpdate));
        assert_eq!(log[0].entity_id, a);
        assert_eq!(log[1].entity_id, b);
    }

    #[test]
    fn test_failure_after_demote_leaves_both_unchanged() {
        let f = fixture(ActivationPolicy::default());
        let a = insert(&f, "1.0.0", VersionStatus::Active);
        let b = insert(&f, "2.0.0", VersionStatus::Approved);

        f.store.fail_points().arm(points::ACTIVATE_AFTER_DEMOTE);
        let err = f.coordinator.activate(b, &Actor::user("owner")).unwrap_err();
        f.store.fail_points().disarm(points::ACTIVATE_AFTER_DEMOTE);

        assert_eq!(err.code(), "MRM_PERSISTENCE_ERROR");
        assert_eq!(status_of(&f, a), VersionStatus::Active);
        assert_eq!(status_of(&f, b), VersionStatus::Approved);
        assert!(f.store.transact(|uow| uow.audit_log()).unwrap().is_empty());
    }

    #[test]
    fn test_non_approved_rejected_with_statuses_in_message() {
        let f = fixture(ActivationPolicy::default());
        let v = insert(&f, "1.0.0", VersionStatus::InValidation);

        let err = f.coordinator.activate(v, &Actor::user("owner")).unwrap_err();
        assert_eq!(err.code(), "MRM_INVALID_STATE");
        assert!(err.to_string().contains("IN_VALIDATION"));
        assert!(err.to_string().contains("APPROVED"));
    }

    #[test]
    fn test_outsider_rejected() {
        let f = fixture(ActivationPolicy::default());
        let v = insert(&f, "1.0.0", VersionStatus::Approved);

        let err = f.coordinator.activate(v, &Actor::user("mallory")).unwrap_err();
        assert_eq!(err.code(), "MRM_PERMISSION_DENIED");
        assert_eq!(status_of(&f, v), VersionStatus::Approved);
    }

    #[test]
    fn test_missing_version() {
        let f = fixture(ActivationPolicy::default());
        let err = f
            .coordinator
            .activate(Uuid::new_v4(), &Actor::admin("root"))
            .unwrap_err();
        assert_eq!(err.code(), "MRM_NOT_FOUND");
    }

    #[test]
    fn test_direct_global_activation_when_enabled() {
        let f = fixture(ActivationPolicy {
            allow_direct_global_activation: true,
        });
        let v = insert(&f, "1.0.0", VersionStatus::Draft);

        let outcome = f.coordinator.activate(v, &Actor::user("owner")).unwrap();
        assert_eq!(outcome.path, ActivationPath::Direct);
        assert_eq!(outcome.activated.old, VersionStatus::Draft);
    }

    #[test]
    fn test_direct_activation_disabled_by_default() {
        let f = fixture(ActivationPolicy::default());
        let v = insert(&f, "1.0.0", VersionStatus::Draft);

        let err = f.coordinator.activate(v, &Actor::user("owner")).unwrap_err();
        assert_eq!(err.code(), "MRM_INVALID_STATE");
    }
}
