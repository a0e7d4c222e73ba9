//! Requests and cancellations of suspension, mirrored into tab state.

use std::sync::Arc;

use crate::managers::tab_state_store::TabStateStore;
use crate::services::collaborators::{QueuedDetails, SuspendManager};
use crate::types::lifecycle::LifecycleEvent;
use crate::types::status::ForceLevel;
use crate::types::tab::Tab;

/// Front end to the external suspend manager. The manager owns the queue
/// entries; this side only keeps each tab's lifecycle and suspend reason in
/// step with what was asked of it.
#[derive(Clone)]
pub struct SuspensionQueue {
    store: TabStateStore,
    manager: Arc<dyn SuspendManager>,
}

impl SuspensionQueue {
    pub fn new(store: TabStateStore, manager: Arc<dyn SuspendManager>) -> Self {
        Self { store, manager }
    }

    /// Queues `tab` at `force_level`. Re-queueing replaces the stored level.
    pub async fn request(&self, tab: &Tab, force_level: ForceLevel) {
        self.store.set(tab.id, |state| {
            state.suspend_reason = Some(force_level.reason());
        });
        let lifecycle = self.store.advance(tab.id, LifecycleEvent::Queue(force_level));
        tracing::info!(tab_id = %tab.id, %lifecycle, "Queueing tab for suspension");
        self.manager.queue(tab, force_level).await;
    }

    /// Removes any queue entry for `tab`. A no-op when nothing is queued.
    pub async fn cancel(&self, tab: &Tab) {
        if self.store.lifecycle(tab.id).is_queued() {
            self.store.set(tab.id, |state| state.suspend_reason = None);
            self.store.advance(tab.id, LifecycleEvent::Unqueue);
            tracing::debug!(tab_id = %tab.id, "Unqueued tab");
        }
        self.manager.unqueue(tab).await;
    }

    pub async fn details(&self, tab: &Tab) -> Option<QueuedDetails> {
        self.manager.queued_details(tab).await
    }
}
