//! SQLite-backed gateway
//!
//! One connection behind a mutex. Each unit of work is a `BEGIN IMMEDIATE`
//! transaction, so the write lock is taken before the first read and
//! concurrent units of work (in this process or another one sharing the
//! database file) are serialized.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::fail_point::FailPoints;
use super::schema::{SCHEMA, SINGLE_ACTIVE_INDEX};
use super::{StatusStore, UnitOfWork};
use crate::audit::{format_timestamp, AuditRecord};
use crate::domain::{Model, ModelVersion, ValidationRequest};
use crate::errors::{EngineError, EngineResult};
use crate::status::{RequestStatus, VersionStatus};

const VERSION_COLUMNS: &str = "version_id, model_id, version_number, change_type, scope, \
     description, status, validation_request_id, created_by, created_at";

const AUDIT_COLUMNS: &str = "seq, audit_id, entity_type, entity_id, action, old_value, \
     new_value, trigger, actor, timestamp, prev_hash, hash";

/// SQLite status store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    fail_points: FailPoints,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::with_connection(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> EngineResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> EngineResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            fail_points: FailPoints::from_env(),
        })
    }

    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)
    }

    /// Fail points consulted by every unit of work of this store.
    pub fn fail_points(&self) -> &FailPoints {
        &self.fail_points
    }
}

impl StatusStore for SqliteStore {
    fn transact<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> EngineResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| EngineError::persistence("connection lock poisoned"))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sqlite_error)?;

        let mut uow = SqliteUnitOfWork {
            tx,
            fail_points: &self.fail_points,
        };
        let value = f(&mut uow)?;
        // Dropping the transaction on the error path above rolls it back.
        uow.tx.commit().map_err(map_sqlite_error)?;
        Ok(value)
    }
}

/// An open `BEGIN IMMEDIATE` transaction.
pub struct SqliteUnitOfWork<'a> {
    tx: Transaction<'a>,
    fail_points: &'a FailPoints,
}

impl SqliteUnitOfWork<'_> {
    fn query_versions(&self, filter: &str, arg: &str) -> EngineResult<Vec<ModelVersion>> {
        let sql = format!(
            "SELECT {} FROM model_versions WHERE {} ORDER BY created_at, version_id",
            VERSION_COLUMNS, filter
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params![arg], version_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(EngineError::from)
    }

    fn query_audit(&self, filter: Option<&str>) -> EngineResult<Vec<AuditRecord>> {
        let mut records = Vec::new();
        match filter {
            Some(entity_id) => {
                let sql = format!(
                    "SELECT {} FROM audit_log WHERE entity_id = ?1 ORDER BY seq",
                    AUDIT_COLUMNS
                );
                let mut stmt = self.tx.prepare(&sql)?;
                for row in stmt.query_map(params![entity_id], audit_from_row)? {
                    records.push(row?);
                }
            }
            None => {
                let sql = format!("SELECT {} FROM audit_log ORDER BY seq", AUDIT_COLUMNS);
                let mut stmt = self.tx.prepare(&sql)?;
                for row in stmt.query_map([], audit_from_row)? {
                    records.push(row?);
                }
            }
        }
        Ok(records)
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn get_version(&self, id: Uuid) -> EngineResult<Option<ModelVersion>> {
        let sql = format!(
            "SELECT {} FROM model_versions WHERE version_id = ?1",
            VERSION_COLUMNS
        );
        self.tx
            .query_row(&sql, params![id.to_string()], version_from_row)
            .optional()
            .map_err(EngineError::from)
    }

    fn get_versions_by_request(&self, request_id: Uuid) -> EngineResult<Vec<ModelVersion>> {
        self.query_versions("validation_request_id = ?1", &request_id.to_string())
    }

    fn get_active_version(&self, model_id: Uuid) -> EngineResult<Option<ModelVersion>> {
        let sql = format!(
            "SELECT {} FROM model_versions WHERE model_id = ?1 AND status = 'ACTIVE'",
            VERSION_COLUMNS
        );
        self.tx
            .query_row(&sql, params![model_id.to_string()], version_from_row)
            .optional()
            .map_err(EngineError::from)
    }

    fn get_versions_by_model(&self, model_id: Uuid) -> EngineResult<Vec<ModelVersion>> {
        self.query_versions("model_id = ?1", &model_id.to_string())
    }

    fn write_version_status(&mut self, id: Uuid, status: VersionStatus) -> EngineResult<()> {
        let changed = self
            .tx
            .execute(
                "UPDATE model_versions SET status = ?1 WHERE version_id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(EngineError::version_not_found(id));
        }
        Ok(())
    }

    fn insert_version(&mut self, version: &ModelVersion) -> EngineResult<()> {
        self.tx
            .execute(
                "INSERT INTO model_versions (version_id, model_id, version_number, change_type, \
                 scope, description, status, validation_request_id, created_by, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    version.id.to_string(),
                    version.model_id.to_string(),
                    version.version_number,
                    version.change_type.as_str(),
                    version.scope.as_str(),
                    version.description,
                    version.status.as_str(),
                    version.validation_request_id.map(|id| id.to_string()),
                    version.created_by,
                    format_timestamp(version.created_at),
                ],
            )
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn update_version_details(&mut self, version: &ModelVersion) -> EngineResult<()> {
        let changed = self
            .tx
            .execute(
                "UPDATE model_versions SET version_number = ?1, change_type = ?2, description = ?3 \
                 WHERE version_id = ?4",
                params![
                    version.version_number,
                    version.change_type.as_str(),
                    version.description,
                    version.id.to_string(),
                ],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(EngineError::version_not_found(version.id));
        }
        Ok(())
    }

    fn link_version(&mut self, version_id: Uuid, request_id: Uuid) -> EngineResult<()> {
        let changed = self
            .tx
            .execute(
                "UPDATE model_versions SET validation_request_id = ?1 WHERE version_id = ?2",
                params![request_id.to_string(), version_id.to_string()],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(EngineError::version_not_found(version_id));
        }
        Ok(())
    }

    fn delete_version(&mut self, id: Uuid) -> EngineResult<()> {
        let changed = self
            .tx
            .execute(
                "DELETE FROM model_versions WHERE version_id = ?1",
                params![id.to_string()],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(EngineError::version_not_found(id));
        }
        Ok(())
    }

    fn get_model(&self, id: Uuid) -> EngineResult<Option<Model>> {
        self.tx
            .query_row(
                "SELECT model_id, name, owner_id, developer_id FROM models WHERE model_id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(Model {
                        id: parse_column(row, 0)?,
                        name: row.get(1)?,
                        owner_id: row.get(2)?,
                        developer_id: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::from)
    }

    fn insert_model(&mut self, model: &Model) -> EngineResult<()> {
        self.tx
            .execute(
                "INSERT INTO models (model_id, name, owner_id, developer_id) VALUES (?1, ?2, ?3, ?4)",
                params![model.id.to_string(), model.name, model.owner_id, model.developer_id],
            )
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn get_request(&self, id: Uuid) -> EngineResult<Option<ValidationRequest>> {
        self.tx
            .query_row(
                "SELECT request_id, status, created_at FROM validation_requests WHERE request_id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(ValidationRequest {
                        id: parse_column(row, 0)?,
                        status: parse_column(row, 1)?,
                        created_at: parse_column(row, 2)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::from)
    }

    fn insert_request(&mut self, request: &ValidationRequest) -> EngineResult<()> {
        self.tx
            .execute(
                "INSERT INTO validation_requests (request_id, status, created_at) VALUES (?1, ?2, ?3)",
                params![
                    request.id.to_string(),
                    request.status.as_str(),
                    format_timestamp(request.created_at),
                ],
            )
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn write_request_status(&mut self, id: Uuid, status: RequestStatus) -> EngineResult<()> {
        let changed = self
            .tx
            .execute(
                "UPDATE validation_requests SET status = ?1 WHERE request_id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(EngineError::request_not_found(id));
        }
        Ok(())
    }

    fn last_audit_hash(&self) -> EngineResult<Option<String>> {
        self.tx
            .query_row(
                "SELECT hash FROM audit_log ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(EngineError::from)
    }

    fn append_audit(&mut self, record: &AuditRecord) -> EngineResult<i64> {
        self.tx
            .execute(
                "INSERT INTO audit_log (audit_id, entity_type, entity_id, action, old_value, \
                 new_value, trigger, actor, timestamp, prev_hash, hash) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.to_string(),
                    record.entity_type.as_str(),
                    record.entity_id.to_string(),
                    record.action.as_str(),
                    record.old_value,
                    record.new_value,
                    record.trigger,
                    record.actor,
                    record.timestamp,
                    record.prev_hash,
                    record.hash,
                ],
            )
            .map_err(map_sqlite_error)?;
        Ok(self.tx.last_insert_rowid())
    }

    fn audit_for_entity(&self, entity_id: Uuid) -> EngineResult<Vec<AuditRecord>> {
        self.query_audit(Some(&entity_id.to_string()))
    }

    fn audit_log(&self) -> EngineResult<Vec<AuditRecord>> {
        self.query_audit(None)
    }

    fn fail_point(&self, name: &str) -> EngineResult<()> {
        self.fail_points.check(name)
    }
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<ModelVersion> {
    let request: Option<String> = row.get(7)?;
    let validation_request_id = match request {
        Some(raw) => Some(
            Uuid::parse_str(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };

    Ok(ModelVersion {
        id: parse_column(row, 0)?,
        model_id: parse_column(row, 1)?,
        version_number: row.get(2)?,
        change_type: parse_column(row, 3)?,
        scope: parse_column(row, 4)?,
        description: row.get(5)?,
        status: parse_column(row, 6)?,
        validation_request_id,
        created_by: row.get(8)?,
        created_at: parse_column::<DateTime<Utc>>(row, 9)?,
    })
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        seq: row.get(0)?,
        id: parse_column(row, 1)?,
        entity_type: parse_column(row, 2)?,
        entity_id: parse_column(row, 3)?,
        action: parse_column(row, 4)?,
        old_value: row.get(5)?,
        new_value: row.get(6)?,
        trigger: row.get(7)?,
        actor: row.get(8)?,
        timestamp: row.get(9)?,
        prev_hash: row.get(10)?,
        hash: row.get(11)?,
    })
}

/// Read a TEXT column and parse it.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Name the single-active index when it is what rejected a write.
fn map_sqlite_error(e: rusqlite::Error) -> EngineError {
    match &e {
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == ErrorCode::ConstraintViolation && msg.contains("model_versions.model_id") =>
        {
            EngineError::persistence(format!(
                "at most one ACTIVE version per model ({}): {}",
                SINGLE_ACTIVE_INDEX, msg
            ))
        }
        _ => EngineError::from(e),
    }
}
