//! Per-tab auto-suspend countdowns.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::managers::suspension_queue::SuspensionQueue;
use crate::managers::tab_state_store::{TabStateStore, TimerHandle};
use crate::services::collaborators::TabAdapter;
use crate::services::status_classifier;
use crate::types::settings::SuspendSettings;
use crate::types::status::ForceLevel;
use crate::types::tab::{Tab, TabId};

/// Arms, re-arms and cancels the auto-suspend timer of each tab. At most one
/// timer is live per tab id.
#[derive(Clone)]
pub struct TimerScheduler {
    store: TabStateStore,
    tabs: Arc<dyn TabAdapter>,
    queue: SuspensionQueue,
    generation: Arc<AtomicU64>,
}

impl TimerScheduler {
    pub fn new(store: TabStateStore, tabs: Arc<dyn TabAdapter>, queue: SuspensionQueue) -> Self {
        Self {
            store,
            tabs,
            queue,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Restarts the countdown for `tab`. Returns whether a timer is now
    /// pending; protected tabs and a disabled or malformed delay leave none.
    pub fn arm(&self, tab: &Tab, settings: &SuspendSettings, is_active: bool) -> bool {
        self.cancel(tab.id);

        if status_classifier::is_protected(tab, is_active, settings) {
            tracing::debug!(tab_id = %tab.id, "Tab is protected, not arming timer");
            return false;
        }
        let delay = match settings.suspend_delay() {
            Ok(Some(delay)) => delay,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(tab_id = %tab.id, error = %e, "Auto-suspend disabled");
                return false;
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let target = Arc::new(AtomicI64::new(tab.id.0));
        let due_at = Instant::now() + delay;
        let task = tokio::spawn(fire(
            delay,
            generation,
            target.clone(),
            self.store.clone(),
            self.tabs.clone(),
            self.queue.clone(),
        ));

        self.store.set(tab.id, |state| {
            state.timer = Some(TimerHandle::new(generation, target, task, due_at));
            state.suspend_due_at = Some(due_at);
        });
        tracing::debug!(tab_id = %tab.id, delay_secs = delay.as_secs(), "Armed auto-suspend timer");
        true
    }

    /// Clears the pending timer without side effects. Returns whether one
    /// was pending.
    pub fn cancel(&self, tab_id: TabId) -> bool {
        self.store.set(tab_id, |state| {
            state.suspend_due_at = None;
            match state.timer.take() {
                Some(timer) => {
                    timer.cancel();
                    true
                }
                None => false,
            }
        })
    }

    pub fn is_armed(&self, tab_id: TabId) -> bool {
        self.store
            .get(tab_id, |state| state.timer.is_some())
            .unwrap_or(false)
    }

    /// Time left until the timer of `tab_id` fires.
    pub fn remaining(&self, tab_id: TabId) -> Option<Duration> {
        self.store
            .get(tab_id, |state| state.suspend_due_at)
            .flatten()
            .map(|due_at| due_at.saturating_duration_since(Instant::now()))
    }
}

async fn fire(
    delay: Duration,
    generation: u64,
    target: Arc<AtomicI64>,
    store: TabStateStore,
    tabs: Arc<dyn TabAdapter>,
    queue: SuspensionQueue,
) {
    tokio::time::sleep(delay).await;

    // The id may have been remapped while the timer was pending.
    let tab_id = TabId(target.load(Ordering::SeqCst));
    store.release_timer(tab_id, generation);

    let Some(tab) = tabs.get(tab_id).await else {
        tracing::debug!(tab_id = %tab_id, "Timer fired for a tab that no longer exists");
        return;
    };
    tracing::info!(tab_id = %tab_id, "Auto-suspend timer fired");
    queue.request(&tab, ForceLevel::Timer).await;
}
