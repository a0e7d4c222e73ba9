//! Ephemeral per-tab state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::managers::lock;
use crate::types::lifecycle::{Lifecycle, LifecycleEvent};
use crate::types::status::SuspendReason;
use crate::types::tab::{ScrollPosition, TabId};

/// A pending auto-suspend timer.
///
/// The tab id the timer will act on is shared with the running task so that a
/// remap can redirect a timer armed under the old id.
#[derive(Debug)]
pub struct TimerHandle {
    generation: u64,
    target: Arc<AtomicI64>,
    task: JoinHandle<()>,
    due_at: Instant,
}

impl TimerHandle {
    pub(crate) fn new(generation: u64, target: Arc<AtomicI64>, task: JoinHandle<()>, due_at: Instant) -> Self {
        Self {
            generation,
            target,
            task,
            due_at,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The tab the timer will resolve when it fires.
    pub fn tab_id(&self) -> TabId {
        TabId(self.target.load(Ordering::SeqCst))
    }

    pub fn due_at(&self) -> Instant {
        self.due_at
    }

    pub(crate) fn retarget(&self, tab_id: TabId) {
        self.target.store(tab_id.0, Ordering::SeqCst);
    }

    pub(crate) fn cancel(&self) {
        self.task.abort();
    }
}

/// Everything the core remembers about one tab between host events.
#[derive(Debug, Default)]
pub struct TabState {
    pub timer: Option<TimerHandle>,
    pub suspend_due_at: Option<Instant>,
    /// Reload the page with the agent's temporary whitelist switched on.
    pub temp_whitelist_on_reload: bool,
    /// Do not treat the next reload of the placeholder as a request to unsuspend.
    pub disable_unsuspend_on_reload: bool,
    /// The placeholder is loading and owes an initialisation once complete.
    pub initialise_suspended_tab: bool,
    /// Placeholder URL captured when it last unloaded.
    pub unloaded_url: Option<String>,
    /// Placeholder history entry to purge once the real page loads.
    pub history_url_to_remove: Option<String>,
    /// Re-enable auto-discard after the next load completes.
    pub set_autodiscardable: bool,
    pub suspend_reason: Option<SuspendReason>,
    /// A discard of this tab has already been handed to the discard manager.
    pub discard_handled: bool,
    pub scroll_pos: Option<ScrollPosition>,
    pub lifecycle: Lifecycle,
}

impl TabState {
    /// A state with nothing recorded is equivalent to no state at all.
    pub fn is_empty(&self) -> bool {
        self.timer.is_none()
            && self.suspend_due_at.is_none()
            && !self.temp_whitelist_on_reload
            && !self.disable_unsuspend_on_reload
            && !self.initialise_suspended_tab
            && self.unloaded_url.is_none()
            && self.history_url_to_remove.is_none()
            && !self.set_autodiscardable
            && self.suspend_reason.is_none()
            && !self.discard_handled
            && self.scroll_pos.is_none()
            && self.lifecycle == Lifecycle::Normal
    }
}

/// Mapping from tab id to [`TabState`]. Cheap to clone; clones share the map.
///
/// No operation fails: unknown ids read as absent and writes create the
/// record lazily. Records that become empty are dropped.
#[derive(Debug, Clone, Default)]
pub struct TabStateStore {
    tabs: Arc<Mutex<HashMap<TabId, TabState>>>,
}

impl TabStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T>(&self, tab_id: TabId, read: impl FnOnce(&TabState) -> T) -> Option<T> {
        lock(&self.tabs).get(&tab_id).map(read)
    }

    pub fn set<T>(&self, tab_id: TabId, write: impl FnOnce(&mut TabState) -> T) -> T {
        let mut tabs = lock(&self.tabs);
        let state = tabs.entry(tab_id).or_default();
        let out = write(state);
        if state.is_empty() {
            tabs.remove(&tab_id);
        }
        out
    }

    /// Cancels any pending timer, then deletes the record. Returns what was
    /// recorded so callers can act on the final values. Idempotent.
    pub fn clear(&self, tab_id: TabId) -> Option<TabState> {
        let mut removed = lock(&self.tabs).remove(&tab_id)?;
        if let Some(timer) = removed.timer.take() {
            tracing::debug!(tab_id = %tab_id, "Removing tab timer");
            timer.cancel();
        }
        removed.suspend_due_at = None;
        tracing::debug!(tab_id = %tab_id, ?removed, "Cleared tab state");
        Some(removed)
    }

    pub fn lifecycle(&self, tab_id: TabId) -> Lifecycle {
        self.get(tab_id, |s| s.lifecycle).unwrap_or_default()
    }

    /// Moves the tab's lifecycle along `event`. The host is authoritative: an
    /// event the table rejects resynchronises the lifecycle to its target.
    pub fn advance(&self, tab_id: TabId, event: LifecycleEvent) -> Lifecycle {
        self.set(tab_id, |state| {
            state.lifecycle = match state.lifecycle.apply(event) {
                Ok(next) => next,
                Err(e) => {
                    tracing::debug!(tab_id = %tab_id, error = %e, "Resynchronising lifecycle with host");
                    event.resync_target()
                }
            };
            state.lifecycle
        })
    }

    /// Re-keys `old` under `new`, redirecting its pending timer. A record
    /// already stored under `new` is replaced. Returns whether `old` had state.
    pub(crate) fn rekey(&self, old: TabId, new: TabId) -> bool {
        let mut tabs = lock(&self.tabs);
        let Some(state) = tabs.remove(&old) else {
            return false;
        };
        if let Some(timer) = &state.timer {
            timer.retarget(new);
        }
        if let Some(replaced) = tabs.insert(new, state) {
            if let Some(timer) = replaced.timer {
                timer.cancel();
            }
        }
        true
    }

    /// Drops the timer record if it is still the one identified by
    /// `generation`, without aborting it. Called by the timer task itself.
    pub(crate) fn release_timer(&self, tab_id: TabId, generation: u64) {
        self.set(tab_id, |state| {
            if state.timer.as_ref().map(TimerHandle::generation) == Some(generation) {
                state.timer = None;
                state.suspend_due_at = None;
            }
        });
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        lock(&self.tabs).contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.tabs).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.tabs).is_empty()
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = lock(&self.tabs).keys().copied().collect();
        ids.sort();
        ids
    }
}
