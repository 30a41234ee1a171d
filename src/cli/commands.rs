//! CLI command implementations
//!
//! Every command except `init` and `serve` opens the configured store,
//! runs one workflow operation and prints its result as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::domain::{Actor, Model, Role};
use crate::errors::EngineError;
use crate::http_server::HttpServer;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::store::SqliteStore;
use crate::workflow::{NewVersion, WorkflowHooks};

use super::args::{ActorArgs, Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Database file name used by `init` when it writes a fresh config.
const DEFAULT_DATABASE_FILE: &str = "mrm_status.db";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(&cli.config, cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init => write_response(init(config_path)?),
        Command::Serve { port } => serve(config_path, port),
        cmd => {
            let (_, hooks) = boot(config_path)?;
            write_response(execute(&hooks, cmd)?)
        }
    }
}

/// Initialize config and database
///
/// Writes a default config next to `config_path` when none exists, then
/// creates the database schema. Fails if the database already exists.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = if config_path.exists() {
        EngineConfig::load(config_path)?
    } else {
        let config = EngineConfig {
            database_path: sibling_path(config_path, DEFAULT_DATABASE_FILE),
            ..EngineConfig::default()
        };
        config.write_new(config_path)?;
        config
    };

    if config.database_path.exists() {
        return Err(CliError::already_initialized(&config.database_path));
    }

    SqliteStore::open(&config.database_path, config.busy_timeout())?;
    Logger::info(
        Event::StoreOpened,
        &[("path", config.database_path.display().to_string().as_str())],
    );

    Ok(json!({
        "initialized": true,
        "config": config_path.display().to_string(),
        "database": config.database_path.display().to_string(),
    }))
}

/// Serve the HTTP API until the process is stopped
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let (config, hooks) = boot(config_path)?;

    let mut http = config.http.clone();
    if let Some(port) = port {
        http.port = port;
    }
    let server = HttpServer::new(http, Arc::new(hooks));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Execute a store-backed command and return its JSON payload
pub fn execute(hooks: &WorkflowHooks<SqliteStore>, cmd: Command) -> CliResult<Value> {
    let value = match cmd {
        Command::Init | Command::Serve { .. } => {
            return Err(CliError::boot_failed(
                "init and serve do not run against an open store",
            ))
        }

        Command::SeedModel {
            name,
            owner,
            developer,
        } => {
            let mut model = Model::new(name, owner);
            if let Some(developer) = developer {
                model = model.with_developer(developer);
            }
            hooks.seed_model(&model)?;
            serde_json::to_value(&model)?
        }

        Command::CreateVersion {
            model_id,
            version_number,
            change_type,
            scope,
            description,
            actor,
        } => {
            let input = NewVersion {
                model_id,
                version_number,
                change_type,
                scope,
                description,
            };
            serde_json::to_value(hooks.create_version(input, &actor_of(actor)?)?)?
        }

        Command::SetRequestStatus {
            request_id,
            status,
            trigger,
            actor,
        } => serde_json::to_value(hooks.change_request_status(
            request_id,
            status,
            &actor_of(actor)?,
            trigger.as_deref(),
        )?)?,

        Command::Decline {
            request_id,
            reason,
            actor,
        } => serde_json::to_value(hooks.decline_request(
            request_id,
            &actor_of(actor)?,
            reason.as_deref(),
        )?)?,

        Command::Approve { request_id, actor } => {
            serde_json::to_value(hooks.approve_request(request_id, &actor_of(actor)?)?)?
        }

        Command::Activate { version_id, actor } => {
            serde_json::to_value(hooks.activate_version(version_id, &actor_of(actor)?)?)?
        }

        Command::ShowVersion { version_id } => serde_json::to_value(hooks.get_version(version_id)?)?,

        Command::Audit { entity_id } => serde_json::to_value(hooks.audit_trail(entity_id)?)?,

        Command::VerifyAudit => serde_json::to_value(hooks.verify_audit()?)?,
    };

    Ok(value)
}

/// Load config, apply the log level and open the store.
fn boot(config_path: &Path) -> CliResult<(EngineConfig, WorkflowHooks<SqliteStore>)> {
    let config = EngineConfig::load(config_path)?;
    let severity = config.log_severity().map_err(CliError::config_error)?;
    Logger::set_min_severity(severity);
    Logger::info(
        Event::ConfigLoaded,
        &[("path", config_path.display().to_string().as_str())],
    );

    if !config.database_path.exists() {
        return Err(CliError::not_initialized(&config.database_path));
    }

    let store = SqliteStore::open(&config.database_path, config.busy_timeout())?;
    Logger::info(
        Event::StoreOpened,
        &[("path", config.database_path.display().to_string().as_str())],
    );

    let hooks = WorkflowHooks::new(
        Arc::new(store),
        Arc::new(MetricsRegistry::new()),
        config.workflow_settings(),
    );
    Ok((config, hooks))
}

fn actor_of(args: ActorArgs) -> CliResult<Actor> {
    if args.role == Role::System || args.actor == Actor::SYSTEM_ID {
        return Err(EngineError::validation("the system actor cannot be impersonated").into());
    }
    Ok(Actor {
        id: args.actor,
        role: args.role,
    })
}

fn sibling_path(config_path: &Path, file_name: &str) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name),
        _ => PathBuf::from(".").join(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use crate::domain::{ChangeType, DeploymentScope};
    use crate::status::RequestStatus;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn initialized() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("mrm.json");
        init(&config_path).unwrap();
        (dir, config_path)
    }

    fn as_actor(id: &str, role: Role) -> ActorArgs {
        ActorArgs {
            actor: id.to_string(),
            role,
        }
    }

    fn id_of(value: &Value, pointer: &str) -> Uuid {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    fn test_init_creates_config_and_database() {
        let (dir, config_path) = initialized();
        let config = EngineConfig::load(&config_path).unwrap();
        assert_eq!(config.database_path, dir.path().join(DEFAULT_DATABASE_FILE));
        assert!(config.database_path.exists());
    }

    #[test]
    fn test_init_twice_fails() {
        let (_dir, config_path) = initialized();
        let err = init(&config_path).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::AlreadyInitialized);
    }

    #[test]
    fn test_boot_requires_database() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("mrm.json");
        EngineConfig {
            database_path: dir.path().join("missing.db"),
            ..EngineConfig::default()
        }
        .write_new(&config_path)
        .unwrap();

        let err = boot(&config_path).err().unwrap();
        assert_eq!(err.code(), &CliErrorCode::NotInitialized);
    }

    #[test]
    fn test_boot_rejects_missing_config() {
        let err = boot(Path::new("/nonexistent/mrm.json")).err().unwrap();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_major_version_flow_through_commands() {
        let (_dir, config_path) = initialized();
        let (_, hooks) = boot(&config_path).unwrap();

        let model = execute(
            &hooks,
            Command::SeedModel {
                name: "pd-retail".into(),
                owner: "alice".into(),
                developer: None,
            },
        )
        .unwrap();
        let model_id = id_of(&model, "/id");

        let created = execute(
            &hooks,
            Command::CreateVersion {
                model_id,
                version_number: "2.0.0".into(),
                change_type: ChangeType::Major,
                scope: DeploymentScope::Global,
                description: "recalibrated".into(),
                actor: as_actor("alice", Role::User),
            },
        )
        .unwrap();
        let version_id = id_of(&created, "/version/id");
        let request_id = id_of(&created, "/validation_request/id");

        for status in [RequestStatus::Planning, RequestStatus::InProgress] {
            execute(
                &hooks,
                Command::SetRequestStatus {
                    request_id,
                    status,
                    trigger: None,
                    actor: as_actor("validator", Role::User),
                },
            )
            .unwrap();
        }

        execute(
            &hooks,
            Command::Approve {
                request_id,
                actor: as_actor("validator", Role::User),
            },
        )
        .unwrap();

        let activated = execute(
            &hooks,
            Command::Activate {
                version_id,
                actor: as_actor("alice", Role::User),
            },
        )
        .unwrap();
        assert_eq!(activated["activated"]["new"], "ACTIVE");

        let shown = execute(&hooks, Command::ShowVersion { version_id }).unwrap();
        assert_eq!(shown["status"], "ACTIVE");

        let verified = execute(&hooks, Command::VerifyAudit).unwrap();
        assert_eq!(verified["result"], "intact");

        let trail = execute(&hooks, Command::Audit { entity_id: version_id }).unwrap();
        assert!(trail.as_array().unwrap().len() >= 4);
    }

    #[test]
    fn test_engine_error_surfaces_engine_code() {
        let (_dir, config_path) = initialized();
        let (_, hooks) = boot(&config_path).unwrap();

        let err = execute(
            &hooks,
            Command::ShowVersion {
                version_id: Uuid::new_v4(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "MRM_NOT_FOUND");
    }

    #[test]
    fn test_system_actor_rejected() {
        let err = actor_of(as_actor("system", Role::User)).unwrap_err();
        assert_eq!(err.code_str(), "MRM_VALIDATION_ERROR");
        assert!(actor_of(as_actor("bob", Role::System)).is_err());
    }
}
