use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned tab identifier. The host may retire an id and hand the same
/// browsing context a new one (discard, prerender swap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

impl WindowId {
    /// Reported by the host when focus leaves all browser windows.
    pub const NONE: WindowId = WindowId(-1);

    pub fn is_none(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Navigation state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Unloaded,
    Loading,
    #[default]
    Complete,
}

/// Snapshot of a host tab as returned by the tab adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub index: usize,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: LoadStatus,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub audible: bool,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default = "default_auto_discardable")]
    pub auto_discardable: bool,
    #[serde(default)]
    pub opener_tab_id: Option<TabId>,
}

fn default_auto_discardable() -> bool {
    true
}

impl Tab {
    /// A loaded, inactive, unpinned tab.
    pub fn new(id: i64, window_id: i64, url: &str) -> Self {
        Self {
            id: TabId(id),
            window_id: WindowId(window_id),
            index: 0,
            url: url.to_string(),
            title: String::new(),
            status: LoadStatus::Complete,
            active: false,
            highlighted: false,
            pinned: false,
            audible: false,
            discarded: false,
            auto_discardable: true,
            opener_tab_id: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }
}

/// Scroll position within a web page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

impl ScrollPosition {
    pub fn vertical(y: f64) -> Self {
        Self { x: 0.0, y }
    }
}

/// The subset of attributes the host reports as changed in one update event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarded: Option<bool>,
}

impl ChangeInfo {
    pub fn status(status: LoadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn discarded() -> Self {
        Self {
            discarded: Some(true),
            ..Self::default()
        }
    }

    pub fn is_load(&self, status: LoadStatus) -> bool {
        self.status == Some(status)
    }

    pub fn is_discard(&self) -> bool {
        self.discarded == Some(true)
    }
}

/// Properties to change on an existing tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_discardable: Option<bool>,
}

impl TabPatch {
    pub fn auto_discardable(value: bool) -> Self {
        Self {
            auto_discardable: Some(value),
            ..Self::default()
        }
    }

    pub fn navigate(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }
}

/// Filter for tab queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(default)]
    pub window_id: Option<WindowId>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub highlighted: Option<bool>,
}

impl TabQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }

    pub fn in_window(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, tab: &Tab) -> bool {
        self.window_id.map_or(true, |w| tab.window_id == w)
            && self.active.map_or(true, |a| tab.active == a)
            && self.highlighted.map_or(true, |h| tab.highlighted == h)
    }
}

/// Properties for a tab the core asks the host to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProps {
    pub url: String,
    #[serde(default)]
    pub window_id: Option<WindowId>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub opener_tab_id: Option<TabId>,
    #[serde(default)]
    pub active: bool,
}
