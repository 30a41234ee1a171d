//! mrm_status - status synchronization for model versions
//!
//! Keeps model version statuses consistent with the validation workflow:
//! automatic transitions driven by validation request status, manual
//! activation with supersession of the previous active version, guard
//! checks on mutations and a hash-chained audit trail.

pub mod audit;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod guard;
pub mod http_server;
pub mod observability;
pub mod status;
pub mod store;
pub mod supersession;
pub mod transition;
pub mod workflow;

pub use errors::{EngineError, EngineResult};
