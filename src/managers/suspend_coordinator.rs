//! Suspend and unsuspend orchestration.
//!
//! Reacts to host events for each tab, drives the tab's lifecycle, and talks
//! to the in-page agent. Handlers never fail: a tab that can no longer be
//! resolved ends the handler early, and collaborator errors are logged.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::managers::focus_tracker::FocusTracker;
use crate::managers::identity_remapper::IdentityRemapper;
use crate::managers::lock;
use crate::managers::suspension_queue::SuspensionQueue;
use crate::managers::tab_state_store::TabStateStore;
use crate::managers::timer_scheduler::TimerScheduler;
use crate::services::collaborators::{self, AgentInfo, CheckOptions, Collaborators, InitPayload};
use crate::services::debounce::Debouncer;
use crate::services::{status_classifier, suspended_url};
use crate::types::errors::HandshakeError;
use crate::types::lifecycle::{Lifecycle, LifecycleEvent};
use crate::types::settings::{CoreConfig, Environment, SuspendSettings};
use crate::types::status::{SuspendReason, TabStatus};
use crate::types::tab::{ChangeInfo, LoadStatus, ScrollPosition, Tab, TabId, TabPatch, TabQuery, WindowId};

/// Diagnostic snapshot of one tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub window_id: WindowId,
    pub tab_id: TabId,
    pub status: TabStatus,
    pub lifecycle: Lifecycle,
    /// Milliseconds until the auto-suspend timer fires.
    pub time_to_suspend_ms: Option<u64>,
}

pub struct SuspendCoordinator {
    config: CoreConfig,
    collab: Collaborators,
    store: TabStateStore,
    focus: Arc<FocusTracker>,
    queue: SuspensionQueue,
    timers: TimerScheduler,
    remapper: IdentityRemapper,
    env: Mutex<Environment>,
    session_save: Debouncer,
}

impl SuspendCoordinator {
    pub fn new(config: CoreConfig, env: Environment, collab: Collaborators) -> Arc<Self> {
        let store = TabStateStore::new();
        let focus = Arc::new(FocusTracker::new(config.focus_delay()));
        let queue = SuspensionQueue::new(store.clone(), collab.suspend_manager.clone());
        let timers = TimerScheduler::new(store.clone(), collab.tabs.clone(), queue.clone());
        let remapper = IdentityRemapper::new(store.clone(), focus.clone());
        let session_save = Debouncer::new(config.session_save_delay());
        Arc::new(Self {
            config,
            collab,
            store,
            focus,
            queue,
            timers,
            remapper,
            env: Mutex::new(env),
            session_save,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    pub fn store(&self) -> &TabStateStore {
        &self.store
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }

    pub fn queue(&self) -> &SuspensionQueue {
        &self.queue
    }

    pub fn timers(&self) -> &TimerScheduler {
        &self.timers
    }

    pub fn remapper(&self) -> &IdentityRemapper {
        &self.remapper
    }

    pub fn environment(&self) -> Environment {
        lock(&self.env).clone()
    }

    pub async fn settings(&self) -> SuspendSettings {
        collaborators::load_settings(self.collab.settings.as_ref()).await
    }

    /// Seeds focus from the host's active tabs and arms timers for every
    /// normal tab.
    pub async fn startup(&self) {
        let active_tabs = self.collab.tabs.query(TabQuery::active()).await;
        let window = self
            .collab
            .tabs
            .last_focused_window()
            .await
            .filter(|w| active_tabs.iter().any(|tab| tab.window_id == *w));
        self.focus.seed(window, &active_tabs);
        self.reset_all_timers().await;
        tracing::info!(active_tabs = active_tabs.len(), "Suspension core initialised");
    }

    // === Agent handshake ===

    async fn bounded<F>(&self, tab_id: TabId, call: F) -> Result<AgentInfo, HandshakeError>
    where
        F: Future<Output = Result<AgentInfo, HandshakeError>>,
    {
        let timeout = self.config.handshake_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(HandshakeError::Timeout { tab_id, timeout }),
        }
    }

    pub async fn request_agent_info(&self, tab_id: TabId) -> Result<AgentInfo, HandshakeError> {
        self.bounded(tab_id, self.collab.agents.request_info(tab_id))
            .await
    }

    /// Sends the init message to the agent of a freshly loaded page. Not
    /// retried here; the tab-check collaborator re-polls unresponsive tabs.
    pub async fn init_tab_agent(
        &self,
        tab: &Tab,
        temp_whitelist: bool,
        scroll_pos: Option<ScrollPosition>,
        settings: &SuspendSettings,
    ) -> Result<AgentInfo, HandshakeError> {
        let payload = InitPayload {
            ignore_forms: settings.ignore_forms,
            temp_whitelist,
            scroll_pos,
        };
        self.bounded(tab.id, self.collab.agents.send_init(tab.id, payload))
            .await
    }

    pub(crate) async fn send_temp_whitelist(
        &self,
        tab_id: TabId,
        enabled: bool,
    ) -> Result<AgentInfo, HandshakeError> {
        self.bounded(tab_id, self.collab.agents.send_temp_whitelist(tab_id, enabled))
            .await
    }

    // === Status ===

    /// Classifies `tab` without contacting its agent.
    pub(crate) async fn classify_with(&self, tab: &Tab, agent_status: Option<TabStatus>) -> TabStatus {
        let settings = self.settings().await;
        status_classifier::classify(tab, agent_status, &settings, &self.environment())
    }

    /// Current status of `tab`. Asks the agent only when `known` is absent
    /// and the host's view does not already decide.
    pub async fn calculate_status(&self, tab: &Tab, known: Option<TabStatus>) -> TabStatus {
        let settings = self.settings().await;
        if let Some(status) = status_classifier::host_status(tab, &settings, &self.environment()) {
            return status;
        }
        let agent_status = match known {
            Some(status) => Some(status),
            None => match self.request_agent_info(tab.id).await {
                Ok(info) => info.status,
                Err(e) => {
                    tracing::debug!(tab_id = %tab.id, error = %e, "No agent status");
                    None
                }
            },
        };
        status_classifier::classify(tab, agent_status, &settings, &self.environment())
    }

    pub(crate) async fn refresh_icon(&self, tab: &Tab, known: Option<TabStatus>) -> TabStatus {
        let status = self.calculate_status(tab, known).await;
        self.collab.presentation.set_icon_status(tab.id, status).await;
        status
    }

    // === Focus ===

    pub async fn handle_window_focus_changed(self: &Arc<Self>, window_id: WindowId) {
        if !self.focus.record_window_focus(window_id) {
            return;
        }
        tracing::debug!(window_id = %window_id, "Window gained focus");

        let focused = self
            .collab
            .tabs
            .query(TabQuery {
                window_id: Some(window_id),
                active: Some(true),
                ..TabQuery::default()
            })
            .await
            .into_iter()
            .next();
        let Some(tab) = focused else {
            tracing::warn!(window_id = %window_id, "No active tab in focused window; it may have been closed");
            return;
        };

        // The commit must not wait on the agent round-trip below.
        let this = Arc::clone(self);
        let committed = tab.clone();
        self.focus.schedule_window_commit(async move {
            let previous = this.focus.commit_window(window_id);
            this.handle_new_stationary_focus(previous, &committed).await;
        });

        self.refresh_icon(&tab, None).await;
    }

    pub async fn handle_tab_focus_changed(self: &Arc<Self>, tab_id: TabId, window_id: WindowId) {
        let Some(tab) = self.collab.tabs.get(tab_id).await else {
            tracing::debug!(tab_id = %tab_id, "Newly focused tab is gone; assuming it was discarded");
            return;
        };
        tracing::debug!(tab_id = %tab_id, "Tab gained focus");
        let previous = self.focus.record_tab_focus(tab_id, window_id);
        self.collab.discards.unqueue_for_discard(&tab).await;

        let env = self.environment();
        let mut agent_status = None;
        if status_classifier::is_normal_tab(&tab, &env, true) {
            agent_status = match self.request_agent_info(tab.id).await {
                Ok(info) => info.status,
                Err(e) => {
                    tracing::debug!(tab_id = %tab_id, error = %e, "Agent did not answer; checking tab");
                    None
                }
            };
            if agent_status.is_none() {
                agent_status = self.collab.tab_checks.check_now(&tab).await;
            }
        }
        let status = self.classify_with(&tab, agent_status).await;
        if self.focus.focused_tab(window_id) == Some(tab.id) {
            self.collab.presentation.set_icon_status(tab.id, status).await;
        }

        let this = Arc::clone(self);
        let committed = tab.clone();
        self.focus.schedule_tab_commit(async move {
            let previous = this.focus.commit_tab(committed.id, window_id);
            this.handle_new_stationary_focus(previous, &committed).await;
        });

        if !self.settings().await.discard_after_suspend {
            return;
        }
        let Some(previous_id) = previous.filter(|id| *id != tab_id) else {
            return;
        };
        let Some(previous_tab) = self.collab.tabs.get(previous_id).await else {
            tracing::debug!(tab_id = %previous_id, "Previously focused tab is gone; probably discarded already");
            return;
        };
        if status_classifier::is_suspended_tab(&previous_tab, &env) {
            tracing::debug!(tab_id = %previous_id, "Queueing previously focused tab for discard");
            self.collab
                .tab_checks
                .queue_check(&previous_tab, CheckOptions::default(), self.config.discard_check_delay())
                .await;
        }
    }

    /// Runs once focus has rested on `focused` past the debounce window.
    pub async fn handle_new_stationary_focus(&self, previous: Option<TabId>, focused: &Tab) {
        tracing::debug!(tab_id = %focused.id, "New stationary tab focus");
        let env = self.environment();

        if status_classifier::is_suspended_tab(focused, &env) {
            self.handle_suspended_tab_focus_gained(focused).await;
        } else if status_classifier::is_normal_tab(focused, &env, false) {
            if let Some(details) = self.queue.details(focused).await {
                // A focus that lands back on the same tab (a closing popup) is not real.
                let is_real_focus = previous.is_some_and(|id| id != focused.id);
                if is_real_focus && details.force_level.is_low() {
                    tracing::info!(tab_id = %focused.id, "Cancelling queued suspension of refocused tab");
                    self.queue.cancel(focused).await;
                }
            }
        }

        let Some(previous_id) = previous.filter(|id| *id != focused.id) else {
            return;
        };
        let Some(previous_tab) = self.collab.tabs.get(previous_id).await else {
            tracing::debug!(tab_id = %previous_id, "Previously stationary tab is gone");
            return;
        };
        if status_classifier::is_normal_tab(&previous_tab, &env, false) {
            self.reset_auto_suspend_timer(&previous_tab).await;
        }
    }

    async fn handle_suspended_tab_focus_gained(&self, tab: &Tab) {
        if !tab.is_loading() {
            self.collab
                .tab_checks
                .queue_check(tab, CheckOptions { refetch_tab: false }, Duration::ZERO)
                .await;
        }
        if !self.settings().await.unsuspend_on_focus {
            return;
        }
        if self.environment().online {
            self.unsuspend(tab).await;
        } else {
            self.collab.suspended_page.show_no_connectivity(tab).await;
        }
    }

    // === Timers ===

    pub(crate) fn arm_timer(&self, tab: &Tab, settings: &SuspendSettings) -> bool {
        self.timers
            .arm(tab, settings, self.focus.is_current_active_tab(tab))
    }

    /// Restarts the idle countdown of `tab`.
    pub async fn reset_auto_suspend_timer(&self, tab: &Tab) -> bool {
        let settings = self.settings().await;
        self.arm_timer(tab, &settings)
    }

    pub async fn reset_all_timers(&self) {
        let settings = self.settings().await;
        let env = self.environment();
        let mut armed = 0usize;
        for tab in self.collab.tabs.query(TabQuery::all()).await {
            if status_classifier::is_normal_tab(&tab, &env, false) && self.arm_timer(&tab, &settings) {
                armed += 1;
            }
        }
        tracing::debug!(armed, "Reset auto-suspend timers");
    }

    // === Unsuspend ===

    /// Navigates a suspended tab back to its original page. Returns whether
    /// the navigation was requested.
    pub async fn unsuspend(&self, tab: &Tab) -> bool {
        if !status_classifier::is_suspended_tab(tab, &self.environment()) {
            tracing::debug!(tab_id = %tab.id, "Tab is not suspended");
            return false;
        }
        let scroll = suspended_url::scroll_position(&tab.url);
        self.store.set(tab.id, |state| state.scroll_pos = Some(scroll));

        let Some(original_url) = suspended_url::original_url(&tab.url) else {
            tracing::info!(tab_id = %tab.id, url = %tab.url, "Suspended tab has no original url");
            return false;
        };

        self.store.set(tab.id, |state| {
            state.history_url_to_remove = Some(tab.url.clone());
            if tab.auto_discardable {
                state.set_autodiscardable = true;
            }
        });
        self.store.advance(tab.id, LifecycleEvent::UnsuspendRequested);
        tracing::info!(tab_id = %tab.id, url = %original_url, "Unsuspending tab");

        // The reload can stall while auto-discard is enabled.
        let patch = TabPatch {
            url: Some(original_url),
            auto_discardable: Some(false),
        };
        if self.collab.tabs.update(tab.id, patch).await.is_none() {
            tracing::debug!(tab_id = %tab.id, "Tab went away before it could be unsuspended");
        }
        true
    }

    // === Tab updates ===

    pub async fn handle_tab_updated(&self, tab: &Tab, change: &ChangeInfo) {
        let settings = self.settings().await;
        if settings.claim_by_default && change.is_load(LoadStatus::Complete) {
            self.claim_tab(tab.id).await;
        }
        if change.url.is_some() {
            tracing::debug!(tab_id = %tab.id, "Tab url changed");
            self.queue_session_save();
        }

        let env = self.environment();
        if status_classifier::is_suspended_tab(tab, &env) {
            self.handle_suspended_tab_changed(tab, change, &settings)
                .await;
        } else if status_classifier::is_normal_tab(tab, &env, false) {
            self.handle_unsuspended_tab_changed(tab, change, &settings)
                .await;
        }
    }

    /// Rewrites a placeholder left behind by another installation so that it
    /// belongs to this one.
    pub async fn claim_tab(&self, tab_id: TabId) -> bool {
        let Some(tab) = self.collab.tabs.get(tab_id).await else {
            return false;
        };
        let origin = self.environment().extension_origin;
        let Some(url) = suspended_url::claim(&tab.url, &origin) else {
            return false;
        };
        tracing::info!(tab_id = %tab_id, "Claiming suspended tab");
        self.collab
            .tabs
            .update(tab_id, TabPatch::navigate(&url))
            .await
            .is_some()
    }

    async fn handle_unsuspended_tab_changed(&self, tab: &Tab, change: &ChangeInfo, settings: &SuspendSettings) {
        if change.status.is_none()
            && change.audible.is_none()
            && change.pinned.is_none()
            && change.discarded.is_none()
        {
            return;
        }
        tracing::debug!(tab_id = %tab.id, ?change, "Unsuspended tab state changed");

        // Cleared during load in case the tab is suspended again before the
        // load finishes.
        if change.is_load(LoadStatus::Loading) {
            self.store.set(tab.id, |state| state.unloaded_url = None);
            self.store.advance(tab.id, LifecycleEvent::LoadStarted);
        }

        if change.is_discard() {
            self.handle_unsuspended_tab_discarded(tab).await;
            return;
        }

        if let Some(details) = self.queue.details(tab).await {
            // Suspension takes precedence over agent setup.
            self.queue.request(tab, details.force_level).await;
            return;
        }

        let mut status_changed = false;
        if let Some(audible) = change.audible {
            if !audible && settings.ignore_audio {
                self.arm_timer(tab, settings);
            }
            status_changed = true;
        }
        if let Some(pinned) = change.pinned {
            if !pinned && settings.ignore_pinned {
                self.arm_timer(tab, settings);
            }
            status_changed = true;
        }
        if let Some(status) = change.status {
            if status == LoadStatus::Complete {
                self.handle_unsuspended_tab_loaded(tab, settings).await;
            }
            status_changed = true;
        }

        if status_changed && self.focus.is_current_focused_tab(tab) {
            self.refresh_icon(tab, None).await;
        }
    }

    /// The host reports some discards twice; only the first is handled.
    async fn handle_unsuspended_tab_discarded(&self, tab: &Tab) {
        let handled = self
            .store
            .get(tab.id, |state| {
                state.discard_handled || state.suspend_reason == Some(SuspendReason::Discarded)
            })
            .unwrap_or(false);
        if handled {
            tracing::debug!(tab_id = %tab.id, "Ignoring duplicate discard event");
            return;
        }

        tracing::info!(tab_id = %tab.id, url = %tab.url, "Unsuspended tab has been discarded");
        self.store.set(tab.id, |state| {
            state.discard_handled = true;
            state.suspend_reason = Some(SuspendReason::Discarded);
        });
        self.store.advance(tab.id, LifecycleEvent::Discarded);
        self.collab.discards.handle_discarded_unsuspended_tab(tab).await;

        // Discarding changes the tab id; the session must see the new one.
        self.queue_session_save();
    }

    async fn handle_unsuspended_tab_loaded(&self, tab: &Tab, settings: &SuspendSettings) {
        let prior = self.store.clear(tab.id).unwrap_or_default();

        if let Some(url) = &prior.history_url_to_remove {
            self.remove_suspended_history(url).await;
        }
        if prior.set_autodiscardable {
            self.collab
                .tabs
                .update(tab.id, TabPatch::auto_discardable(true))
                .await;
        }

        self.arm_timer(tab, settings);
        if let Err(e) = self
            .init_tab_agent(tab, prior.temp_whitelist_on_reload, prior.scroll_pos, settings)
            .await
        {
            tracing::warn!(tab_id = %tab.id, error = %e, "Failed to send init to agent; tab may not behave as expected");
        }
    }

    async fn remove_suspended_history(&self, suspended: &str) {
        self.collab.history.delete_url(suspended).await;
        if let Some(original) = suspended_url::original_url(suspended) {
            self.collab.history.delete_previous_visit(&original).await;
        }
    }

    async fn handle_suspended_tab_changed(&self, tab: &Tab, change: &ChangeInfo, settings: &SuspendSettings) {
        if change.status.is_none() && change.discarded.is_none() {
            return;
        }
        tracing::debug!(tab_id = %tab.id, ?change, "Suspended tab state changed");

        if change.is_load(LoadStatus::Loading) {
            // The complete event may arrive before anything else looks at
            // the tab; it must know an initialisation is owed.
            self.store
                .set(tab.id, |state| state.initialise_suspended_tab = true);
            self.store.advance(tab.id, LifecycleEvent::SuspendStarted);
            return;
        }

        if change.is_load(LoadStatus::Complete) || change.is_discard() {
            self.queue.cancel(tab).await;
            let owed = self
                .store
                .get(tab.id, |state| state.initialise_suspended_tab)
                .unwrap_or(false);
            if owed {
                self.initialise_suspended_tab(tab, settings).await;
            }
        }
    }

    async fn initialise_suspended_tab(&self, tab: &Tab, settings: &SuspendSettings) {
        let prior = self.store.clear(tab.id).unwrap_or_default();
        self.store.set(tab.id, |state| {
            state.lifecycle = prior.lifecycle;
            state.suspend_reason = prior.suspend_reason;
        });
        self.store.advance(tab.id, LifecycleEvent::SuspendCommitted);

        if self.focus.is_current_focused_tab(tab) {
            self.collab
                .presentation
                .set_icon_status(tab.id, TabStatus::Suspended)
                .await;
        }

        let refreshed = prior.unloaded_url.as_deref() == Some(tab.url.as_str());
        if refreshed && !prior.disable_unsuspend_on_reload {
            tracing::info!(tab_id = %tab.id, "Suspended tab was reloaded; unsuspending");
            self.unsuspend(tab).await;
            return;
        }

        let quick_init = settings.discard_after_suspend && !tab.active;
        if let Err(e) = self.collab.suspended_page.init(tab, quick_init).await {
            tracing::warn!(tab_id = %tab.id, error = %e, "Failed to initialise suspended tab");
        }
        self.collab
            .tab_checks
            .queue_check(tab, CheckOptions { refetch_tab: true }, self.config.suspended_check_delay())
            .await;
    }

    // === Other host events ===

    pub async fn handle_tab_created(&self, tab: &Tab) {
        tracing::debug!(tab_id = %tab.id, url = %tab.url, "Tab created");
        self.queue_session_save();

        // Usually a re-opened closed tab; give it time to load before checking.
        if status_classifier::is_suspended_tab(tab, &self.environment()) && !tab.active {
            self.collab
                .tab_checks
                .queue_check(tab, CheckOptions::default(), self.config.reopened_check_delay())
                .await;
        }
    }

    pub fn handle_tab_removed(&self, tab_id: TabId) {
        tracing::debug!(tab_id = %tab_id, "Tab removed");
        self.queue_session_save();
        self.remapper.retire(tab_id);
    }

    pub fn handle_tab_replaced(&self, added: TabId, removed: TabId) {
        self.remapper.remap(added, removed);
    }

    /// Records the placeholder URL as it unloads so that the following load
    /// can be recognised as a refresh. Only the focused tab counts: a
    /// background reload is not the user asking to unsuspend.
    pub fn handle_suspended_page_unloading(&self, tab: &Tab) {
        if self.focus.is_current_focused_tab(tab) {
            self.store
                .set(tab.id, |state| state.unloaded_url = Some(tab.url.clone()));
        }
    }

    /// Status pushed by an agent. Tabs holding form input or a temporary
    /// whitelist must not be auto-discarded.
    pub async fn handle_agent_report(&self, tab: &Tab, status: Option<TabStatus>) {
        if status.is_some_and(|s| s.is_agent_hold()) {
            self.collab
                .tabs
                .update(tab.id, TabPatch::auto_discardable(false))
                .await;
        } else if !tab.auto_discardable {
            self.collab
                .tabs
                .update(tab.id, TabPatch::auto_discardable(true))
                .await;
        }
        if self.focus.is_current_focused_tab(tab) {
            self.refresh_icon(tab, status).await;
        }
    }

    pub async fn handle_charging_changed(&self, charging: bool) {
        lock(&self.env).charging = charging;
        tracing::info!(charging, "Charging state changed");
        self.refresh_active_tab_icon().await;
        // Tabs may have been held back while charging.
        if !charging && self.settings().await.ignore_when_charging {
            self.reset_all_timers().await;
        }
    }

    pub async fn handle_connectivity_changed(&self, online: bool) {
        lock(&self.env).online = online;
        tracing::info!(online, "Connectivity changed");
        if online && self.settings().await.ignore_when_offline {
            self.reset_all_timers().await;
        }
        self.refresh_active_tab_icon().await;
    }

    async fn refresh_active_tab_icon(&self) {
        if let Some(tab) = self.current_active_tab().await {
            self.refresh_icon(&tab, None).await;
        }
    }

    /// Schedules a session snapshot, coalescing bursts of changes.
    pub fn queue_session_save(&self) {
        let session = self.collab.session.clone();
        self.session_save.schedule(async move {
            tracing::debug!("Updating current session");
            session.update_current_session().await;
        });
    }

    pub async fn debug_info(&self, tab_id: TabId) -> Option<DebugInfo> {
        let tab = self.collab.tabs.get(tab_id).await?;
        let status = self.calculate_status(&tab, None).await;
        Some(DebugInfo {
            window_id: tab.window_id,
            tab_id,
            status,
            lifecycle: self.store.lifecycle(tab_id),
            time_to_suspend_ms: self
                .timers
                .remaining(tab_id)
                .map(|left| u64::try_from(left.as_millis()).unwrap_or(u64::MAX)),
        })
    }
}
