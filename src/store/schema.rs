//! SQLite schema
//!
//! Three persisted structures: the version status field (with its nullable
//! request link), validation requests, and the append-only audit log.
//! Models are kept only for the capability check.

/// Name of the partial unique index holding the single-active invariant.
pub const SINGLE_ACTIVE_INDEX: &str = "uq_model_versions_single_active";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS models (
    model_id     TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    owner_id     TEXT NOT NULL,
    developer_id TEXT
);

CREATE TABLE IF NOT EXISTS validation_requests (
    request_id TEXT PRIMARY KEY,
    status     TEXT NOT NULL CHECK (status IN (
        'INTAKE', 'PLANNING', 'IN_PROGRESS', 'PENDING_APPROVAL',
        'APPROVED', 'CANCELLED', 'ON_HOLD')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS model_versions (
    version_id            TEXT PRIMARY KEY,
    model_id              TEXT NOT NULL REFERENCES models(model_id),
    version_number        TEXT NOT NULL,
    change_type           TEXT NOT NULL CHECK (change_type IN ('MINOR', 'MAJOR')),
    scope                 TEXT NOT NULL CHECK (scope IN ('GLOBAL', 'REGIONAL')),
    description           TEXT NOT NULL DEFAULT '',
    status                TEXT NOT NULL CHECK (status IN (
        'DRAFT', 'IN_VALIDATION', 'APPROVED', 'ACTIVE', 'SUPERSEDED')),
    validation_request_id TEXT REFERENCES validation_requests(request_id),
    created_by            TEXT NOT NULL,
    created_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_model_versions_request
    ON model_versions(validation_request_id);

CREATE INDEX IF NOT EXISTS idx_model_versions_model
    ON model_versions(model_id);

CREATE UNIQUE INDEX IF NOT EXISTS uq_model_versions_single_active
    ON model_versions(model_id) WHERE status = 'ACTIVE';

CREATE TABLE IF NOT EXISTS audit_log (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    audit_id    TEXT NOT NULL UNIQUE,
    entity_type TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    action      TEXT NOT NULL,
    old_value   TEXT,
    new_value   TEXT,
    trigger     TEXT NOT NULL,
    actor       TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    prev_hash   TEXT NOT NULL,
    hash        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_log_entity
    ON audit_log(entity_type, entity_id);

CREATE TRIGGER IF NOT EXISTS audit_log_no_update
    BEFORE UPDATE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
    BEFORE DELETE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;
";
