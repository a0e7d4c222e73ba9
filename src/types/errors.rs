use std::time::Duration;

use crate::types::lifecycle::{Lifecycle, LifecycleEvent};
use crate::types::tab::TabId;

// === HandshakeError ===

/// Errors from a message round-trip with a tab's in-page agent.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The agent is not attached or the host refused the message.
    #[error("Agent unreachable in tab {tab_id}: {reason}")]
    Unreachable { tab_id: TabId, reason: String },
    /// The agent never answered within the bounded wait.
    #[error("Agent in tab {tab_id} did not respond within {timeout:?}")]
    Timeout { tab_id: TabId, timeout: Duration },
    /// The agent answered with an error payload.
    #[error("Agent in tab {tab_id} rejected the request: {reason}")]
    Rejected { tab_id: TabId, reason: String },
}

impl HandshakeError {
    pub fn tab_id(&self) -> TabId {
        match self {
            HandshakeError::Unreachable { tab_id, .. }
            | HandshakeError::Timeout { tab_id, .. }
            | HandshakeError::Rejected { tab_id, .. } => *tab_id,
        }
    }
}

// === CommandError ===

/// Errors returned to external suspend/unsuspend requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown request action: {0}")]
    UnknownAction(String),
    #[error("Tab id must be an integer: {0}")]
    InvalidTabId(String),
    #[error("No tab found with id: {0}")]
    TabNotFound(TabId),
    #[error("Failed to find a target tab")]
    NoTargetTab,
    #[error("Tab is already suspended: {0}")]
    AlreadySuspended(TabId),
    #[error("Tab is not suspended: {0}")]
    NotSuspended(TabId),
}

// === TransitionError ===

/// A lifecycle event that the state table does not allow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid lifecycle transition: {event} from {from}")]
    Invalid { from: Lifecycle, event: LifecycleEvent },
}

// === SettingsError ===

/// Malformed option values. Never fatal: the affected feature is disabled.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// Suspend delay is not a number of minutes.
    #[error("Invalid suspend time: {0:?}")]
    InvalidSuspendTime(String),
    /// Option value has the wrong type.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// === ReplayError ===

/// Errors reading a replay script.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Replay I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Replay parse error on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
