//! Contracts of the external collaborators the core drives.
//!
//! Every call is infallible from the core's point of view: lookups return
//! `None` when the target is gone, and only agent round-trips surface an
//! error, because the core must log those.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::errors::HandshakeError;
use crate::types::settings::{SettingKey, SuspendSettings};
use crate::types::status::{ForceLevel, TabStatus};
use crate::types::tab::{CreateProps, ScrollPosition, Tab, TabId, TabPatch, TabQuery, WindowId};

/// Payload of the init message sent to a freshly loaded page's agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub ignore_forms: bool,
    pub temp_whitelist: bool,
    pub scroll_pos: Option<ScrollPosition>,
}

/// What an agent reports about its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub status: Option<TabStatus>,
    #[serde(default)]
    pub scroll_pos: Option<ScrollPosition>,
}

/// A pending entry in the suspend manager's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedDetails {
    pub force_level: ForceLevel,
}

/// Options for a scheduled responsiveness check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOptions {
    /// Re-resolve the tab from the host before checking.
    pub refetch_tab: bool,
}

/// Low-level tab and window access.
#[async_trait]
pub trait TabAdapter: Send + Sync {
    async fn get(&self, tab_id: TabId) -> Option<Tab>;
    async fn query(&self, filter: TabQuery) -> Vec<Tab>;
    async fn update(&self, tab_id: TabId, patch: TabPatch) -> Option<Tab>;
    async fn create(&self, props: CreateProps) -> Option<Tab>;
    async fn last_focused_window(&self) -> Option<WindowId>;
}

/// Browsing history cleanup after an unsuspend.
#[async_trait]
pub trait BrowserHistory: Send + Sync {
    async fn delete_url(&self, url: &str);
    /// Removes the most recent visit to `url` before the current one.
    async fn delete_previous_visit(&self, url: &str);
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_option(&self, key: SettingKey) -> Option<Value>;
    async fn set_option(&self, key: SettingKey, value: Value);
}

/// Reads every option into a typed snapshot. Malformed values keep their
/// default and are logged.
pub async fn load_settings(store: &dyn SettingsStore) -> SuspendSettings {
    let mut options = Vec::with_capacity(SettingKey::ALL.len());
    for key in SettingKey::ALL {
        options.push((key, store.get_option(key).await));
    }
    let (settings, errors) = SuspendSettings::from_options(options);
    for e in errors {
        tracing::warn!(error = %e, "Ignoring malformed option");
    }
    settings
}

/// Message bridge to the in-page agent of a tab.
#[async_trait]
pub trait AgentMessenger: Send + Sync {
    async fn send_init(&self, tab_id: TabId, payload: InitPayload) -> Result<AgentInfo, HandshakeError>;
    async fn request_info(&self, tab_id: TabId) -> Result<AgentInfo, HandshakeError>;
    async fn send_temp_whitelist(&self, tab_id: TabId, enabled: bool) -> Result<AgentInfo, HandshakeError>;
}

/// Owner of the suspension queue; performs the actual suspension.
#[async_trait]
pub trait SuspendManager: Send + Sync {
    async fn queue(&self, tab: &Tab, force_level: ForceLevel);
    async fn unqueue(&self, tab: &Tab);
    async fn queued_details(&self, tab: &Tab) -> Option<QueuedDetails>;
}

/// Deferred responsiveness checks; the retry path for failed handshakes.
#[async_trait]
pub trait TabCheckManager: Send + Sync {
    async fn queue_check(&self, tab: &Tab, options: CheckOptions, delay: Duration);
    /// Runs a check immediately and returns the agent status it found.
    async fn check_now(&self, tab: &Tab) -> Option<TabStatus>;
}

#[async_trait]
pub trait DiscardManager: Send + Sync {
    async fn handle_discarded_unsuspended_tab(&self, tab: &Tab);
    async fn unqueue_for_discard(&self, tab: &Tab);
}

/// The suspended placeholder page.
#[async_trait]
pub trait SuspendedPage: Send + Sync {
    async fn init(&self, tab: &Tab, quick_init: bool) -> Result<(), String>;
    async fn show_no_connectivity(&self, tab: &Tab);
}

/// Toolbar icon and badge.
#[async_trait]
pub trait Presentation: Send + Sync {
    async fn set_icon_status(&self, tab_id: TabId, status: TabStatus);
}

#[async_trait]
pub trait SessionRecorder: Send + Sync {
    async fn update_current_session(&self);
}

/// Every collaborator the core talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub tabs: Arc<dyn TabAdapter>,
    pub history: Arc<dyn BrowserHistory>,
    pub settings: Arc<dyn SettingsStore>,
    pub agents: Arc<dyn AgentMessenger>,
    pub suspend_manager: Arc<dyn SuspendManager>,
    pub tab_checks: Arc<dyn TabCheckManager>,
    pub discards: Arc<dyn DiscardManager>,
    pub suspended_page: Arc<dyn SuspendedPage>,
    pub presentation: Arc<dyn Presentation>,
    pub session: Arc<dyn SessionRecorder>,
}

impl Collaborators {
    /// Wires a single host object that implements every contract.
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: TabAdapter
            + BrowserHistory
            + SettingsStore
            + AgentMessenger
            + SuspendManager
            + TabCheckManager
            + DiscardManager
            + SuspendedPage
            + Presentation
            + SessionRecorder
            + 'static,
    {
        Self {
            tabs: host.clone(),
            history: host.clone(),
            settings: host.clone(),
            agents: host.clone(),
            suspend_manager: host.clone(),
            tab_checks: host.clone(),
            discards: host.clone(),
            suspended_page: host.clone(),
            presentation: host.clone(),
            session: host,
        }
    }
}
