//! Status Lifecycle Tests
//!
//! End-to-end flows through the workflow hooks:
//! - DRAFT -> IN_VALIDATION -> APPROVED -> ACTIVE, prior ACTIVE superseded
//! - Each trigger row yields one AUTO_STATUS_UPDATE record
//! - Repeated and out-of-order triggers are no-ops
//! - Decline and hold return in-validation versions to DRAFT

use std::sync::Arc;

use mrm_status::audit::{AuditAction, AuditRecord};
use mrm_status::domain::{Actor, ChangeType, DeploymentScope, Model};
use mrm_status::observability::MetricsRegistry;
use mrm_status::status::{RequestStatus, VersionStatus};
use mrm_status::store::SqliteStore;
use mrm_status::workflow::{NewVersion, WorkflowHooks, WorkflowSettings};
use uuid::Uuid;

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    hooks: WorkflowHooks<SqliteStore>,
    model: Model,
    owner: Actor,
    validator: Actor,
}

fn fixture() -> Fixture {
    let hooks = WorkflowHooks::new(
        Arc::new(SqliteStore::open_in_memory().unwrap()),
        Arc::new(MetricsRegistry::new()),
        WorkflowSettings::default(),
    );
    let model = Model::new("PD retail", "alice").with_developer("dave");
    hooks.seed_model(&model).unwrap();
    Fixture {
        hooks,
        model,
        owner: Actor::user("alice"),
        validator: Actor::user("val-team"),
    }
}

impl Fixture {
    /// MAJOR version with its auto-created INTAKE request.
    fn major(&self, number: &str) -> (Uuid, Uuid) {
        let created = self
            .hooks
            .create_version(
                NewVersion {
                    model_id: self.model.id,
                    version_number: number.to_string(),
                    change_type: ChangeType::Major,
                    scope: DeploymentScope::Global,
                    description: format!("release {}", number),
                },
                &self.owner,
            )
            .unwrap();
        let request = created.validation_request.expect("major versions get a request");
        (created.version.id, request.id)
    }

    fn set(&self, request_id: Uuid, status: RequestStatus) -> usize {
        self.hooks
            .change_request_status(request_id, status, &self.validator, None)
            .unwrap()
            .version_changes
            .len()
    }

    fn status(&self, version_id: Uuid) -> VersionStatus {
        self.hooks.get_version(version_id).unwrap().status
    }

    fn auto_updates(&self, version_id: Uuid) -> Vec<AuditRecord> {
        self.hooks
            .audit_trail(version_id)
            .unwrap()
            .into_iter()
            .filter(|r| r.action == AuditAction::AutoStatusUpdate)
            .collect()
    }

    /// Drive a fresh MAJOR version all the way to ACTIVE.
    fn activated(&self, number: &str) -> Uuid {
        let (version_id, request_id) = self.major(number);
        self.set(request_id, RequestStatus::InProgress);
        self.hooks.approve_request(request_id, &self.validator).unwrap();
        self.hooks.activate_version(version_id, &self.owner).unwrap();
        version_id
    }
}

// =============================================================================
// End-to-end
// =============================================================================

#[test]
fn test_full_lifecycle_supersedes_previous_active() {
    let f = fixture();
    let v1 = f.activated("1.0.0");
    assert_eq!(f.status(v1), VersionStatus::Active);

    let (v2, r2) = f.major("2.0.0");
    assert_eq!(f.status(v2), VersionStatus::Draft);

    f.set(r2, RequestStatus::Planning);
    assert_eq!(f.status(v2), VersionStatus::Draft);

    f.set(r2, RequestStatus::InProgress);
    assert_eq!(f.status(v2), VersionStatus::InValidation);

    f.hooks.approve_request(r2, &f.validator).unwrap();
    assert_eq!(f.status(v2), VersionStatus::Approved);

    let outcome = f.hooks.activate_version(v2, &Actor::user("dave")).unwrap();
    assert_eq!(outcome.activated.new, VersionStatus::Active);
    let demoted = outcome.demoted.expect("v1 was active");
    assert_eq!(demoted.version_id, v1);
    assert_eq!(demoted.new, VersionStatus::Superseded);

    assert_eq!(f.status(v1), VersionStatus::Superseded);
    assert_eq!(f.status(v2), VersionStatus::Active);

    let manual: Vec<_> = f
        .hooks
        .audit_trail(v1)
        .unwrap()
        .into_iter()
        .filter(|r| r.action == AuditAction::ManualStatusUpdate)
        .collect();
    assert_eq!(manual.len(), 2, "v1 activated then superseded");
    assert_eq!(manual[1].old_value.as_deref(), Some("ACTIVE"));
    assert_eq!(manual[1].new_value.as_deref(), Some("SUPERSEDED"));
    assert_eq!(manual[1].actor, "dave");

    assert!(f.hooks.verify_audit().unwrap().is_intact());
}

// =============================================================================
// Trigger rows
// =============================================================================

#[test]
fn test_in_progress_row() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");
    assert_eq!(f.set(r, RequestStatus::InProgress), 1);

    let records = f.auto_updates(v);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].old_value.as_deref(), Some("DRAFT"));
    assert_eq!(records[0].new_value.as_deref(), Some("IN_VALIDATION"));
    assert_eq!(records[0].trigger, "validation_request.status -> IN_PROGRESS");
    assert_eq!(records[0].actor, "val-team");
}

#[test]
fn test_approved_row() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");
    f.set(r, RequestStatus::InProgress);
    assert_eq!(f.set(r, RequestStatus::Approved), 1);

    let records = f.auto_updates(v);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].old_value.as_deref(), Some("IN_VALIDATION"));
    assert_eq!(records[1].new_value.as_deref(), Some("APPROVED"));
}

#[test]
fn test_cancelled_and_on_hold_rows_return_to_draft() {
    for status in [RequestStatus::Cancelled, RequestStatus::OnHold] {
        let f = fixture();
        let (v, r) = f.major("1.0.0");
        f.set(r, RequestStatus::InProgress);
        assert_eq!(f.set(r, status), 1);
        assert_eq!(f.status(v), VersionStatus::Draft);

        let records = f.auto_updates(v);
        assert_eq!(records.last().unwrap().new_value.as_deref(), Some("DRAFT"));
    }
}

#[test]
fn test_decline_records_reason_in_trigger() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");
    f.set(r, RequestStatus::InProgress);

    let outcome = f
        .hooks
        .decline_request(r, &f.validator, Some("insufficient backtesting"))
        .unwrap();
    assert_eq!(outcome.new_status, RequestStatus::Cancelled);
    assert_eq!(f.status(v), VersionStatus::Draft);

    let last = f.auto_updates(v).pop().unwrap();
    assert!(last.trigger.contains("insufficient backtesting"));

    // A declined version is editable again.
    f.hooks.delete_version(v, &f.owner).unwrap();
}

#[test]
fn test_custom_trigger_description() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");
    f.hooks
        .change_request_status(r, RequestStatus::InProgress, &f.validator, Some("kickoff meeting"))
        .unwrap();
    assert_eq!(f.auto_updates(v)[0].trigger, "kickoff meeting");
}

// =============================================================================
// Idempotence and ordering
// =============================================================================

#[test]
fn test_repeated_trigger_is_noop() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");
    assert_eq!(f.set(r, RequestStatus::InProgress), 1);
    assert_eq!(f.set(r, RequestStatus::InProgress), 0);

    assert_eq!(f.status(v), VersionStatus::InValidation);
    assert_eq!(f.auto_updates(v).len(), 1);
}

#[test]
fn test_out_of_order_approval_is_noop() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");

    // APPROVED arriving while the version is still DRAFT matches no row.
    assert_eq!(f.set(r, RequestStatus::Approved), 0);
    assert_eq!(f.status(v), VersionStatus::Draft);
    assert!(f.auto_updates(v).is_empty());
}

#[test]
fn test_non_trigger_statuses_leave_versions_alone() {
    let f = fixture();
    let (v, r) = f.major("1.0.0");
    f.set(r, RequestStatus::InProgress);

    for status in [RequestStatus::Intake, RequestStatus::Planning, RequestStatus::PendingApproval] {
        assert_eq!(f.set(r, status), 0);
        assert_eq!(f.status(v), VersionStatus::InValidation);
    }
}

#[test]
fn test_active_version_ignores_late_cancel() {
    let f = fixture();
    let v = f.activated("1.0.0");
    let r = f.hooks.get_version(v).unwrap().validation_request_id.unwrap();

    assert_eq!(f.set(r, RequestStatus::Cancelled), 0);
    assert_eq!(f.status(v), VersionStatus::Active);
}

// =============================================================================
// Linking
// =============================================================================

#[test]
fn test_minor_version_without_request_stays_draft() {
    let f = fixture();
    let created = f
        .hooks
        .create_version(
            NewVersion {
                model_id: f.model.id,
                version_number: "1.0.1".into(),
                change_type: ChangeType::Minor,
                scope: DeploymentScope::Regional,
                description: String::new(),
            },
            &f.owner,
        )
        .unwrap();
    assert!(created.validation_request.is_none());
    assert!(created.version.validation_request_id.is_none());
}

#[test]
fn test_linked_versions_move_together() {
    let f = fixture();
    let (v1, r) = f.major("2.0.0");
    let minor = f
        .hooks
        .create_version(
            NewVersion {
                model_id: f.model.id,
                version_number: "2.0.1".into(),
                change_type: ChangeType::Minor,
                scope: DeploymentScope::Global,
                description: "hotfix".into(),
            },
            &f.owner,
        )
        .unwrap();
    let v2 = minor.version.id;
    f.hooks.link_request(v2, r, &f.owner).unwrap();

    assert_eq!(f.set(r, RequestStatus::InProgress), 2);
    assert_eq!(f.status(v1), VersionStatus::InValidation);
    assert_eq!(f.status(v2), VersionStatus::InValidation);
}

#[test]
fn test_unknown_request_is_not_found() {
    let f = fixture();
    let err = f
        .hooks
        .change_request_status(Uuid::new_v4(), RequestStatus::InProgress, &f.validator, None)
        .unwrap_err();
    assert_eq!(err.code(), "MRM_NOT_FOUND");
}

#[test]
fn test_metrics_count_cascade() {
    let f = fixture();
    let (_, r) = f.major("1.0.0");
    f.set(r, RequestStatus::InProgress);
    f.set(r, RequestStatus::InProgress);

    let snapshot = f.hooks.metrics().snapshot();
    assert_eq!(snapshot.auto_status_updates, 1);
    assert_eq!(snapshot.versions_created, 1);
    assert_eq!(snapshot.request_status_changes, 1);
}
