//! Focused and stationary tab/window tracking.
//!
//! Raw focus events are recorded immediately; the stationary view is
//! committed by a debounced second stage so that keying through many tabs
//! only settles on the last one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use crate::managers::lock;
use crate::services::debounce::Debouncer;
use crate::types::tab::{Tab, TabId, WindowId};

/// Process-wide focus view. Window slots are never removed once created;
/// a slot whose tab went away holds `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusState {
    pub focused_window_id: Option<WindowId>,
    pub stationary_window_id: Option<WindowId>,
    pub focused_tab_by_window: HashMap<WindowId, Option<TabId>>,
    pub stationary_tab_by_window: HashMap<WindowId, Option<TabId>>,
}

impl FocusState {
    fn references(&self, tab_id: TabId) -> bool {
        self.focused_tab_by_window
            .values()
            .chain(self.stationary_tab_by_window.values())
            .any(|slot| *slot == Some(tab_id))
    }
}

pub struct FocusTracker {
    state: Mutex<FocusState>,
    window_commit: Debouncer,
    tab_commit: Debouncer,
}

impl FocusTracker {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: Mutex::new(FocusState::default()),
            window_commit: Debouncer::new(delay),
            tab_commit: Debouncer::new(delay),
        }
    }

    /// Initial view at startup: every active tab is both focused and
    /// stationary in its window.
    pub fn seed(&self, window_id: Option<WindowId>, active_tabs: &[Tab]) {
        let mut state = lock(&self.state);
        state.focused_window_id = window_id;
        state.stationary_window_id = window_id;
        for tab in active_tabs {
            state.focused_tab_by_window.insert(tab.window_id, Some(tab.id));
            state.stationary_tab_by_window.insert(tab.window_id, Some(tab.id));
        }
    }

    /// Records a raw window focus change. Returns `false` when the event is
    /// ignored: focus left the browser, or the window already has focus.
    pub fn record_window_focus(&self, window_id: WindowId) -> bool {
        let mut state = lock(&self.state);
        if window_id.is_none() || state.focused_window_id == Some(window_id) {
            return false;
        }
        state.focused_window_id = Some(window_id);
        true
    }

    /// Records a raw tab focus change; returns the previously focused tab of
    /// that window.
    pub fn record_tab_focus(&self, tab_id: TabId, window_id: WindowId) -> Option<TabId> {
        lock(&self.state)
            .focused_tab_by_window
            .insert(window_id, Some(tab_id))
            .flatten()
    }

    /// Makes `window_id` the stationary window. Returns the stationary tab of
    /// the window that previously held that role.
    pub fn commit_window(&self, window_id: WindowId) -> Option<TabId> {
        let mut state = lock(&self.state);
        let previous_window = state.stationary_window_id.replace(window_id);
        previous_window
            .and_then(|w| state.stationary_tab_by_window.get(&w).copied())
            .flatten()
    }

    /// Makes `tab_id` the stationary tab of `window_id`; returns the previous one.
    pub fn commit_tab(&self, tab_id: TabId, window_id: WindowId) -> Option<TabId> {
        lock(&self.state)
            .stationary_tab_by_window
            .insert(window_id, Some(tab_id))
            .flatten()
    }

    /// Replaces any pending window commit with `job`.
    pub fn schedule_window_commit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.window_commit.schedule(job);
    }

    /// Replaces any pending tab commit with `job`.
    pub fn schedule_tab_commit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tab_commit.schedule(job);
    }

    pub fn has_pending_commit(&self) -> bool {
        self.window_commit.is_pending() || self.tab_commit.is_pending()
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        lock(&self.state).focused_window_id
    }

    pub fn stationary_window(&self) -> Option<WindowId> {
        lock(&self.state).stationary_window_id
    }

    pub fn focused_tab(&self, window_id: WindowId) -> Option<TabId> {
        lock(&self.state)
            .focused_tab_by_window
            .get(&window_id)
            .copied()
            .flatten()
    }

    pub fn stationary_tab(&self, window_id: WindowId) -> Option<TabId> {
        lock(&self.state)
            .stationary_tab_by_window
            .get(&window_id)
            .copied()
            .flatten()
    }

    /// Whether `tab` is the focused tab of the focused window. Falls back to
    /// the host's `active` flag for a window with no recorded focused tab.
    pub fn is_current_focused_tab(&self, tab: &Tab) -> bool {
        if self.focused_window() != Some(tab.window_id) {
            return false;
        }
        match self.focused_tab(tab.window_id) {
            Some(tab_id) => tab_id == tab.id,
            None => tab.active,
        }
    }

    /// Whether `tab` is the settled tab of the settled window. Falls back to
    /// the host's `active` flag for a window with no recorded stationary tab.
    pub fn is_current_stationary_tab(&self, tab: &Tab) -> bool {
        if self.stationary_window() != Some(tab.window_id) {
            return false;
        }
        match self.stationary_tab(tab.window_id) {
            Some(tab_id) => tab_id == tab.id,
            None => tab.active,
        }
    }

    /// Whether `tab` is the focused tab of its window, falling back to the
    /// host's `active` flag when nothing is recorded.
    pub fn is_current_active_tab(&self, tab: &Tab) -> bool {
        match self.focused_tab(tab.window_id) {
            Some(tab_id) => tab_id == tab.id,
            None => tab.active,
        }
    }

    /// Rewrites every reference to `old` as `new`.
    pub fn remap_tab(&self, old: TabId, new: TabId) {
        let mut state = lock(&self.state);
        let FocusState {
            focused_tab_by_window,
            stationary_tab_by_window,
            ..
        } = &mut *state;
        for slot in focused_tab_by_window
            .values_mut()
            .chain(stationary_tab_by_window.values_mut())
        {
            if *slot == Some(old) {
                *slot = Some(new);
            }
        }
    }

    /// Clears every reference to `tab_id`, keeping the window slots.
    pub fn retire_tab(&self, tab_id: TabId) {
        let mut state = lock(&self.state);
        let FocusState {
            focused_tab_by_window,
            stationary_tab_by_window,
            ..
        } = &mut *state;
        for slot in focused_tab_by_window
            .values_mut()
            .chain(stationary_tab_by_window.values_mut())
        {
            if *slot == Some(tab_id) {
                *slot = None;
            }
        }
    }

    pub fn references(&self, tab_id: TabId) -> bool {
        lock(&self.state).references(tab_id)
    }

    pub fn snapshot(&self) -> FocusState {
        lock(&self.state).clone()
    }
}
