//! Per-tab suspension lifecycle.
//!
//! ```text
//! NORMAL ─queue─▶ QUEUED ─suspend started─▶ SUSPENDING ─committed─▶ SUSPENDED
//!   ▲  │            │                                                  │
//!   │  │            └─unqueue─▶ NORMAL                      unsuspend requested
//!   │  └─discarded─▶ DISCARDED                                         ▼
//!   └────────── load completed ◀── LOADING ◀── load started ── UNSUSPENDING
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::errors::TransitionError;
use crate::types::status::ForceLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "forceLevel")]
pub enum Lifecycle {
    #[default]
    Normal,
    Queued(ForceLevel),
    Suspending,
    Suspended,
    Unsuspending,
    Loading,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    Queue(ForceLevel),
    Unqueue,
    /// The suspended placeholder started loading in the tab.
    SuspendStarted,
    /// The suspended placeholder finished loading.
    SuspendCommitted,
    UnsuspendRequested,
    /// The original page started loading.
    LoadStarted,
    LoadCompleted,
    Discarded,
}

impl Lifecycle {
    /// Applies `event`, rejecting transitions outside the state table.
    pub fn apply(self, event: LifecycleEvent) -> Result<Lifecycle, TransitionError> {
        use Lifecycle as L;
        use LifecycleEvent as E;

        let next = match (self, event) {
            (L::Normal | L::Queued(_), E::Queue(level)) => L::Queued(level),
            (L::Queued(_), E::Unqueue) => L::Normal,
            (state, E::Unqueue) if state != L::Discarded => state,
            (L::Normal | L::Queued(_) | L::Suspended, E::SuspendStarted) => L::Suspending,
            (L::Suspending, E::SuspendCommitted) => L::Suspended,
            (L::Suspended, E::UnsuspendRequested) => L::Unsuspending,
            (L::Unsuspending, E::LoadStarted) => L::Loading,
            (L::Normal, E::LoadStarted) => L::Normal,
            (L::Unsuspending | L::Loading | L::Normal, E::LoadCompleted) => L::Normal,
            (L::Normal | L::Queued(_), E::Discarded) => L::Discarded,
            (from, event) => return Err(TransitionError::Invalid { from, event }),
        };
        Ok(next)
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Lifecycle::Queued(_))
    }
}

impl LifecycleEvent {
    /// The state the host has demonstrably reached when it reports this event,
    /// regardless of what the core believed beforehand.
    pub fn resync_target(self) -> Lifecycle {
        match self {
            LifecycleEvent::Queue(level) => Lifecycle::Queued(level),
            LifecycleEvent::Unqueue => Lifecycle::Normal,
            LifecycleEvent::SuspendStarted => Lifecycle::Suspending,
            LifecycleEvent::SuspendCommitted => Lifecycle::Suspended,
            LifecycleEvent::UnsuspendRequested => Lifecycle::Unsuspending,
            LifecycleEvent::LoadStarted => Lifecycle::Loading,
            LifecycleEvent::LoadCompleted => Lifecycle::Normal,
            LifecycleEvent::Discarded => Lifecycle::Discarded,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Normal => f.write_str("normal"),
            Lifecycle::Queued(level) => write!(f, "queued({})", level.level()),
            Lifecycle::Suspending => f.write_str("suspending"),
            Lifecycle::Suspended => f.write_str("suspended"),
            Lifecycle::Unsuspending => f.write_str("unsuspending"),
            Lifecycle::Loading => f.write_str("loading"),
            Lifecycle::Discarded => f.write_str("discarded"),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Queue(level) => write!(f, "queue({})", level.level()),
            LifecycleEvent::Unqueue => f.write_str("unqueue"),
            LifecycleEvent::SuspendStarted => f.write_str("suspendStarted"),
            LifecycleEvent::SuspendCommitted => f.write_str("suspendCommitted"),
            LifecycleEvent::UnsuspendRequested => f.write_str("unsuspendRequested"),
            LifecycleEvent::LoadStarted => f.write_str("loadStarted"),
            LifecycleEvent::LoadCompleted => f.write_str("loadCompleted"),
            LifecycleEvent::Discarded => f.write_str("discarded"),
        }
    }
}
