//! Transition Engine
//!
//! Validation request status changes drive linked model version statuses
//! through the trigger table in [`rules`]. The cascade is a command object:
//! [`StatusSyncCommand`] plans, [`StatusSyncPlan::apply`] writes inside one
//! unit of work.

mod command;
mod engine;
pub mod rules;

pub use command::{StatusChange, StatusSyncCommand, StatusSyncPlan, TriggerEvent};
pub use engine::TransitionEngine;
pub(crate) use engine::report_sync;
pub use rules::{desired_status, TriggerRule, TRIGGER_RULES};
