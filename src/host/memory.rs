//! In-memory host.
//!
//! Implements every collaborator contract over plain maps and records each
//! outbound call in a journal, so that a sequence of host events can be
//! driven through the core and its effects asserted on.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::managers::lock;
use crate::services::collaborators::{
    AgentInfo, AgentMessenger, BrowserHistory, CheckOptions, DiscardManager, InitPayload, Presentation,
    QueuedDetails, SessionRecorder, SettingsStore, SuspendManager, SuspendedPage, TabAdapter, TabCheckManager,
};
use crate::types::errors::HandshakeError;
use crate::types::settings::SettingKey;
use crate::types::status::{ForceLevel, TabStatus};
use crate::types::tab::{CreateProps, Tab, TabId, TabPatch, TabQuery, WindowId};

/// One outbound call made by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "call")]
pub enum HostCall {
    #[serde(rename_all = "camelCase")]
    UpdateTab { tab_id: TabId, patch: TabPatch },
    #[serde(rename_all = "camelCase")]
    CreateTab { tab_id: TabId, props: CreateProps },
    DeleteUrl { url: String },
    DeletePreviousVisit { url: String },
    SetOption { key: SettingKey, value: Value },
    #[serde(rename_all = "camelCase")]
    SendInit { tab_id: TabId, payload: InitPayload },
    #[serde(rename_all = "camelCase")]
    RequestInfo { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    SendTempWhitelist { tab_id: TabId, enabled: bool },
    #[serde(rename_all = "camelCase")]
    Queue { tab_id: TabId, force_level: ForceLevel },
    #[serde(rename_all = "camelCase")]
    Unqueue { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    QueueCheck {
        tab_id: TabId,
        options: CheckOptions,
        delay_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    CheckNow { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    HandleDiscarded { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    UnqueueForDiscard { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    InitSuspendedPage { tab_id: TabId, quick_init: bool },
    #[serde(rename_all = "camelCase")]
    ShowNoConnectivity { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    SetIcon { tab_id: TabId, status: TabStatus },
    UpdateSession,
}

/// How the in-page agent of a tab answers messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AgentBehavior {
    Reply {
        #[serde(default)]
        status: Option<TabStatus>,
    },
    /// No agent attached; every message fails immediately.
    Unreachable,
    /// Messages are accepted but never answered.
    Hang,
}

impl Default for AgentBehavior {
    fn default() -> Self {
        AgentBehavior::Reply {
            status: Some(TabStatus::Normal),
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    tabs: BTreeMap<TabId, Tab>,
    options: HashMap<SettingKey, Value>,
    agents: HashMap<TabId, AgentBehavior>,
    queue: BTreeMap<TabId, ForceLevel>,
    check_results: HashMap<TabId, TabStatus>,
    last_focused_window: Option<WindowId>,
    next_tab_id: i64,
    calls: Vec<HostCall>,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: HostCall) {
        lock(&self.state).calls.push(call);
    }

    pub fn insert_tab(&self, tab: Tab) {
        let mut state = lock(&self.state);
        state.next_tab_id = state.next_tab_id.max(tab.id.0 + 1);
        state.tabs.insert(tab.id, tab);
    }

    pub fn tab(&self, tab_id: TabId) -> Option<Tab> {
        lock(&self.state).tabs.get(&tab_id).cloned()
    }

    /// Edits a stored tab in place. Returns the edited tab.
    pub fn modify_tab(&self, tab_id: TabId, edit: impl FnOnce(&mut Tab)) -> Option<Tab> {
        let mut state = lock(&self.state);
        let tab = state.tabs.get_mut(&tab_id)?;
        edit(tab);
        Some(tab.clone())
    }

    /// Gives the tab stored under `old` the id `new`, as the host does when
    /// it discards a tab.
    pub fn replace_tab(&self, old: TabId, new: TabId) -> Option<Tab> {
        let mut state = lock(&self.state);
        let mut tab = state.tabs.remove(&old)?;
        tab.id = new;
        state.next_tab_id = state.next_tab_id.max(new.0 + 1);
        state.tabs.insert(new, tab.clone());
        if let Some(behavior) = state.agents.remove(&old) {
            state.agents.insert(new, behavior);
        }
        if let Some(level) = state.queue.remove(&old) {
            state.queue.insert(new, level);
        }
        Some(tab)
    }

    pub fn remove_tab(&self, tab_id: TabId) -> Option<Tab> {
        let mut state = lock(&self.state);
        state.queue.remove(&tab_id);
        state.agents.remove(&tab_id);
        state.tabs.remove(&tab_id)
    }

    pub fn put_option(&self, key: SettingKey, value: Value) {
        lock(&self.state).options.insert(key, value);
    }

    pub fn option(&self, key: SettingKey) -> Option<Value> {
        lock(&self.state).options.get(&key).cloned()
    }

    pub fn set_agent(&self, tab_id: TabId, behavior: AgentBehavior) {
        lock(&self.state).agents.insert(tab_id, behavior);
    }

    /// Status returned by an immediate tab check of `tab_id`.
    pub fn set_check_result(&self, tab_id: TabId, status: TabStatus) {
        lock(&self.state).check_results.insert(tab_id, status);
    }

    pub fn set_last_focused_window(&self, window_id: Option<WindowId>) {
        lock(&self.state).last_focused_window = window_id;
    }

    pub fn queued(&self, tab_id: TabId) -> Option<ForceLevel> {
        lock(&self.state).queue.get(&tab_id).copied()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        lock(&self.state).calls.clone()
    }

    /// Returns and forgets every call recorded so far.
    pub fn drain(&self) -> Vec<HostCall> {
        std::mem::take(&mut lock(&self.state).calls)
    }

    fn agent(&self, tab_id: TabId) -> AgentBehavior {
        lock(&self.state)
            .agents
            .get(&tab_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn answer(&self, tab_id: TabId) -> Result<AgentInfo, HandshakeError> {
        match self.agent(tab_id) {
            AgentBehavior::Reply { status } => Ok(AgentInfo {
                status,
                scroll_pos: None,
            }),
            AgentBehavior::Unreachable => Err(HandshakeError::Unreachable {
                tab_id,
                reason: "Could not establish connection. Receiving end does not exist.".to_string(),
            }),
            AgentBehavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl TabAdapter for MemoryHost {
    async fn get(&self, tab_id: TabId) -> Option<Tab> {
        self.tab(tab_id)
    }

    async fn query(&self, filter: TabQuery) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = lock(&self.state)
            .tabs
            .values()
            .filter(|tab| filter.matches(tab))
            .cloned()
            .collect();
        tabs.sort_by_key(|tab| (tab.window_id, tab.index, tab.id));
        tabs
    }

    async fn update(&self, tab_id: TabId, patch: TabPatch) -> Option<Tab> {
        self.record(HostCall::UpdateTab {
            tab_id,
            patch: patch.clone(),
        });
        self.modify_tab(tab_id, |tab| {
            if let Some(url) = patch.url {
                tab.url = url;
            }
            if let Some(auto_discardable) = patch.auto_discardable {
                tab.auto_discardable = auto_discardable;
            }
        })
    }

    async fn create(&self, props: CreateProps) -> Option<Tab> {
        let mut state = lock(&self.state);
        let tab_id = TabId(state.next_tab_id.max(1));
        state.next_tab_id = tab_id.0 + 1;
        let window_id = props
            .window_id
            .or(state.last_focused_window)
            .unwrap_or(WindowId(1));
        let mut tab = Tab::new(tab_id.0, window_id.0, &props.url);
        tab.index = props.index.unwrap_or(state.tabs.len());
        tab.active = props.active;
        tab.opener_tab_id = props.opener_tab_id;
        state.tabs.insert(tab_id, tab.clone());
        state.calls.push(HostCall::CreateTab { tab_id, props });
        Some(tab)
    }

    async fn last_focused_window(&self) -> Option<WindowId> {
        lock(&self.state).last_focused_window
    }
}

#[async_trait]
impl BrowserHistory for MemoryHost {
    async fn delete_url(&self, url: &str) {
        self.record(HostCall::DeleteUrl {
            url: url.to_string(),
        });
    }

    async fn delete_previous_visit(&self, url: &str) {
        self.record(HostCall::DeletePreviousVisit {
            url: url.to_string(),
        });
    }
}

#[async_trait]
impl SettingsStore for MemoryHost {
    async fn get_option(&self, key: SettingKey) -> Option<Value> {
        self.option(key)
    }

    async fn set_option(&self, key: SettingKey, value: Value) {
        self.record(HostCall::SetOption {
            key,
            value: value.clone(),
        });
        self.put_option(key, value);
    }
}

#[async_trait]
impl AgentMessenger for MemoryHost {
    async fn send_init(&self, tab_id: TabId, payload: InitPayload) -> Result<AgentInfo, HandshakeError> {
        self.record(HostCall::SendInit { tab_id, payload });
        self.answer(tab_id).await
    }

    async fn request_info(&self, tab_id: TabId) -> Result<AgentInfo, HandshakeError> {
        self.record(HostCall::RequestInfo { tab_id });
        self.answer(tab_id).await
    }

    async fn send_temp_whitelist(&self, tab_id: TabId, enabled: bool) -> Result<AgentInfo, HandshakeError> {
        self.record(HostCall::SendTempWhitelist { tab_id, enabled });
        let info = self.answer(tab_id).await?;
        let status = if enabled {
            TabStatus::TempWhitelist
        } else {
            TabStatus::Normal
        };
        self.set_agent(tab_id, AgentBehavior::Reply { status: Some(status) });
        Ok(AgentInfo {
            status: Some(status),
            ..info
        })
    }
}

#[async_trait]
impl SuspendManager for MemoryHost {
    async fn queue(&self, tab: &Tab, force_level: ForceLevel) {
        let mut state = lock(&self.state);
        state.queue.insert(tab.id, force_level);
        state.calls.push(HostCall::Queue {
            tab_id: tab.id,
            force_level,
        });
    }

    async fn unqueue(&self, tab: &Tab) {
        let mut state = lock(&self.state);
        if state.queue.remove(&tab.id).is_some() {
            state.calls.push(HostCall::Unqueue { tab_id: tab.id });
        }
    }

    async fn queued_details(&self, tab: &Tab) -> Option<QueuedDetails> {
        self.queued(tab.id)
            .map(|force_level| QueuedDetails { force_level })
    }
}

#[async_trait]
impl TabCheckManager for MemoryHost {
    async fn queue_check(&self, tab: &Tab, options: CheckOptions, delay: Duration) {
        self.record(HostCall::QueueCheck {
            tab_id: tab.id,
            options,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        });
    }

    async fn check_now(&self, tab: &Tab) -> Option<TabStatus> {
        let mut state = lock(&self.state);
        state.calls.push(HostCall::CheckNow { tab_id: tab.id });
        state.check_results.get(&tab.id).copied()
    }
}

#[async_trait]
impl DiscardManager for MemoryHost {
    async fn handle_discarded_unsuspended_tab(&self, tab: &Tab) {
        self.record(HostCall::HandleDiscarded { tab_id: tab.id });
    }

    async fn unqueue_for_discard(&self, tab: &Tab) {
        self.record(HostCall::UnqueueForDiscard { tab_id: tab.id });
    }
}

#[async_trait]
impl SuspendedPage for MemoryHost {
    async fn init(&self, tab: &Tab, quick_init: bool) -> Result<(), String> {
        self.record(HostCall::InitSuspendedPage {
            tab_id: tab.id,
            quick_init,
        });
        Ok(())
    }

    async fn show_no_connectivity(&self, tab: &Tab) {
        self.record(HostCall::ShowNoConnectivity { tab_id: tab.id });
    }
}

#[async_trait]
impl Presentation for MemoryHost {
    async fn set_icon_status(&self, tab_id: TabId, status: TabStatus) {
        self.record(HostCall::SetIcon { tab_id, status });
    }
}

#[async_trait]
impl SessionRecorder for MemoryHost {
    async fn update_current_session(&self) {
        self.record(HostCall::UpdateSession);
    }
}
