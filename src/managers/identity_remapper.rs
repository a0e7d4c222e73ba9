//! Keeps internal references valid when the host renumbers or removes a tab.

use std::sync::Arc;

use crate::managers::focus_tracker::FocusTracker;
use crate::managers::tab_state_store::TabStateStore;
use crate::types::tab::TabId;

#[derive(Clone)]
pub struct IdentityRemapper {
    store: TabStateStore,
    focus: Arc<FocusTracker>,
}

impl IdentityRemapper {
    pub fn new(store: TabStateStore, focus: Arc<FocusTracker>) -> Self {
        Self { store, focus }
    }

    /// Moves everything known about `old` to `new`. A timer armed under
    /// `old` resolves `new` when it fires.
    pub fn remap(&self, new: TabId, old: TabId) {
        if new == old {
            return;
        }
        let moved = self.store.rekey(old, new);
        self.focus.remap_tab(old, new);
        tracing::info!(old_tab_id = %old, new_tab_id = %new, moved_state = moved, "Remapped tab id");
    }

    /// Forgets `tab_id`: clears its state and empties any focus slot that
    /// pointed at it.
    pub fn retire(&self, tab_id: TabId) {
        self.store.clear(tab_id);
        self.focus.retire_tab(tab_id);
        tracing::debug!(tab_id = %tab_id, "Retired tab id");
    }
}
