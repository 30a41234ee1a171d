//! Observable events
//!
//! Every log line names exactly one of these.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    ConfigLoaded,
    StoreOpened,
    Serving,

    // Transition engine
    /// A version status was changed by a validation request trigger
    AutoStatusUpdate,
    /// A trigger matched no rule for a linked version
    TransitionNoop,
    /// A validation request status was written
    RequestStatusChanged,

    // Supersession
    VersionActivated,
    VersionSuperseded,

    // Version lifecycle
    VersionCreated,
    VersionUpdated,
    VersionDeleted,

    // Failures
    /// Guard rejected an operation (status or capability)
    GuardDenied,
    /// Unit of work rolled back on a storage failure
    PersistenceFailure,

    // Audit
    AuditChainVerified,
    AuditChainBroken,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpened => "STORE_OPENED",
            Event::Serving => "MRM_SERVING",
            Event::AutoStatusUpdate => "AUTO_STATUS_UPDATE",
            Event::TransitionNoop => "TRANSITION_NOOP",
            Event::RequestStatusChanged => "REQUEST_STATUS_CHANGED",
            Event::VersionActivated => "VERSION_ACTIVATED",
            Event::VersionSuperseded => "VERSION_SUPERSEDED",
            Event::VersionCreated => "VERSION_CREATED",
            Event::VersionUpdated => "VERSION_UPDATED",
            Event::VersionDeleted => "VERSION_DELETED",
            Event::GuardDenied => "GUARD_DENIED",
            Event::PersistenceFailure => "PERSISTENCE_FAILURE",
            Event::AuditChainVerified => "AUDIT_CHAIN_VERIFIED",
            Event::AuditChainBroken => "AUDIT_CHAIN_BROKEN",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
