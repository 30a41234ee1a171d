//! Supersession Coordinator
//!
//! Manual activation of an approved version, atomically superseding the
//! model's previous ACTIVE version.

mod coordinator;

pub use coordinator::{ActivationOutcome, SupersessionCoordinator};
