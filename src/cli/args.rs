//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::{ChangeType, DeploymentScope, Role};
use crate::status::RequestStatus;

/// mrm-status - model version status synchronization
#[derive(Parser, Debug)]
#[command(name = "mrm-status")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./mrm_status.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Identity the command acts as.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Actor identity recorded in the audit log
    #[arg(long)]
    pub actor: String,

    /// Actor role: user or admin
    #[arg(long, default_value = "user")]
    pub role: Role,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config (if missing) and create the database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Register a model for capability checks
    SeedModel {
        #[arg(long)]
        name: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        developer: Option<String>,
    },

    /// Create a DRAFT version
    CreateVersion {
        #[arg(long)]
        model_id: Uuid,
        #[arg(long)]
        version_number: String,
        /// MINOR or MAJOR
        #[arg(long)]
        change_type: ChangeType,
        /// GLOBAL or REGIONAL
        #[arg(long, default_value = "GLOBAL")]
        scope: DeploymentScope,
        #[arg(long, default_value = "")]
        description: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Change a validation request's status and sync linked versions
    SetRequestStatus {
        #[arg(long)]
        request_id: Uuid,
        #[arg(long)]
        status: RequestStatus,
        /// Trigger description stored on resulting audit records
        #[arg(long)]
        trigger: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Decline a validation request
    Decline {
        #[arg(long)]
        request_id: Uuid,
        #[arg(long)]
        reason: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Approve a validation request
    Approve {
        #[arg(long)]
        request_id: Uuid,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Activate an approved version
    Activate {
        #[arg(long)]
        version_id: Uuid,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Print a version
    ShowVersion {
        #[arg(long)]
        version_id: Uuid,
    },

    /// Print the audit trail of a version or validation request
    Audit {
        #[arg(long)]
        entity_id: Uuid,
    },

    /// Verify the audit hash chain
    VerifyAudit,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
