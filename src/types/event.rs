//! Inbound events the dispatcher accepts from the host.

use serde::{Deserialize, Serialize};

use crate::types::status::TabStatus;
use crate::types::tab::{ChangeInfo, Tab, TabId, WindowId};

/// Host and agent notifications, in the order the host delivers them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum HostEvent {
    #[serde(rename_all = "camelCase")]
    WindowFocusChanged { window_id: WindowId },
    #[serde(rename_all = "camelCase")]
    TabActivated { tab_id: TabId, window_id: WindowId },
    #[serde(rename_all = "camelCase")]
    TabUpdated {
        tab_id: TabId,
        change: ChangeInfo,
        tab: Tab,
    },
    TabCreated { tab: Tab },
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },
    /// The host swapped the identifier of a browsing context.
    #[serde(rename_all = "camelCase")]
    TabReplaced { added_tab_id: TabId, removed_tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    WindowCreated { window_id: WindowId },
    #[serde(rename_all = "camelCase")]
    WindowRemoved { window_id: WindowId },
    /// The suspended placeholder in `tab` is about to unload.
    SuspendedPageUnloading { tab: Tab },
    /// Status pushed by the in-page agent.
    AgentReport { tab: Tab, status: Option<TabStatus> },
    ChargingChanged { charging: bool },
    ConnectivityChanged { online: bool },
    Command { command: Command },
}

impl HostEvent {
    /// Short name used as a span field.
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::WindowFocusChanged { .. } => "windowFocusChanged",
            HostEvent::TabActivated { .. } => "tabActivated",
            HostEvent::TabUpdated { .. } => "tabUpdated",
            HostEvent::TabCreated { .. } => "tabCreated",
            HostEvent::TabRemoved { .. } => "tabRemoved",
            HostEvent::TabReplaced { .. } => "tabReplaced",
            HostEvent::WindowCreated { .. } => "windowCreated",
            HostEvent::WindowRemoved { .. } => "windowRemoved",
            HostEvent::SuspendedPageUnloading { .. } => "suspendedPageUnloading",
            HostEvent::AgentReport { .. } => "agentReport",
            HostEvent::ChargingChanged { .. } => "chargingChanged",
            HostEvent::ConnectivityChanged { .. } => "connectivityChanged",
            HostEvent::Command { .. } => "command",
        }
    }
}

/// Delivery lane of an event. Events sharing a lane are handled in arrival
/// order; different lanes run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Tab(TabId),
    /// Window, environment and command events.
    Global,
}

impl HostEvent {
    pub fn lane(&self) -> Lane {
        match self {
            HostEvent::TabActivated { tab_id, .. }
            | HostEvent::TabUpdated { tab_id, .. }
            | HostEvent::TabRemoved { tab_id } => Lane::Tab(*tab_id),
            // Later events for the new id must see the remapped state.
            HostEvent::TabReplaced { added_tab_id, .. } => Lane::Tab(*added_tab_id),
            HostEvent::TabCreated { tab }
            | HostEvent::SuspendedPageUnloading { tab }
            | HostEvent::AgentReport { tab, .. } => Lane::Tab(tab.id),
            HostEvent::WindowFocusChanged { .. }
            | HostEvent::WindowCreated { .. }
            | HostEvent::WindowRemoved { .. }
            | HostEvent::ChargingChanged { .. }
            | HostEvent::ConnectivityChanged { .. }
            | HostEvent::Command { .. } => Lane::Global,
        }
    }

    /// The last event a tab lane will see.
    pub fn closes_lane(&self) -> bool {
        matches!(self, HostEvent::TabRemoved { .. })
    }
}

/// User commands from keyboard shortcuts, context menus and the popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "name")]
pub enum Command {
    ToggleSuspendHighlighted,
    SuspendHighlighted,
    UnsuspendHighlighted,
    ToggleTempWhitelistHighlighted,
    #[serde(rename_all = "camelCase")]
    WhitelistHighlighted { include_path: bool },
    UnwhitelistHighlighted,
    SuspendSelected,
    UnsuspendSelected,
    SuspendAllInWindow { force: bool },
    UnsuspendAllInWindow,
    SuspendAllWindows { force: bool },
    UnsuspendAllWindows,
    #[serde(rename_all = "camelCase")]
    OpenLinkInSuspendedTab { parent_tab_id: TabId, url: String },
}

/// Request from another extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRequest {
    pub action: String,
    /// Raw id as received; must be an integer when present.
    #[serde(default)]
    pub tab_id: Option<serde_json::Value>,
}
