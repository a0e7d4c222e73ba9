//! Suspension status of a tab.
//!
//! `classify` is the single source of truth for both the toolbar icon and
//! suspension eligibility. It is pure: the same inputs always give the same
//! status, and the first matching rule wins.

use crate::services::suspended_url;
use crate::types::settings::{Environment, SuspendSettings};
use crate::types::status::TabStatus;
use crate::types::tab::Tab;

const WEB_STORE_HOSTS: [&str; 2] = ["chrome.google.com/webstore", "chromewebstore.google.com"];

pub fn is_suspended_tab(tab: &Tab, env: &Environment) -> bool {
    suspended_url::is_suspended_url(&tab.url, &env.extension_origin)
}

/// A `file://` tab the user has not granted access to.
pub fn is_blocked_file_tab(tab: &Tab, env: &Environment) -> bool {
    tab.url.starts_with("file://") && !env.file_access_allowed
}

/// Tabs that can never be suspended: browser-internal pages, other extension
/// pages, the web store.
pub fn is_special_tab(tab: &Tab, env: &Environment) -> bool {
    let url = tab.url.as_str();
    if is_suspended_tab(tab, env) || suspended_url::is_any_suspended_url(url) {
        return false;
    }
    if WEB_STORE_HOSTS
        .iter()
        .any(|host| url.split_once("://").is_some_and(|(_, rest)| rest.starts_with(host)))
    {
        return true;
    }
    !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://"))
}

/// An ordinary web page: neither special nor suspended.
pub fn is_normal_tab(tab: &Tab, env: &Environment, exclude_discarded: bool) -> bool {
    !is_special_tab(tab, env)
        && !is_suspended_tab(tab, env)
        && !(exclude_discarded && tab.discarded)
}

/// Whether an auto-suspend timer must not run for `tab`. `is_active` is the
/// caller's view of whether the tab holds focus in its window.
pub fn is_protected(tab: &Tab, is_active: bool, settings: &SuspendSettings) -> bool {
    (settings.ignore_pinned && tab.pinned)
        || (settings.ignore_audio && tab.audible)
        || (settings.ignore_active_tabs && is_active)
}

/// Rules that depend only on the host's view of the tab and the settings.
/// `None` means the agent's report is needed to decide.
pub fn host_status(tab: &Tab, settings: &SuspendSettings, env: &Environment) -> Option<TabStatus> {
    if tab.is_loading() {
        return Some(TabStatus::Loading);
    }
    // More specific than `special`, so it is checked first.
    if is_blocked_file_tab(tab, env) {
        return Some(TabStatus::BlockedFile);
    }
    if is_special_tab(tab, env) {
        return Some(TabStatus::Special);
    }
    if tab.discarded {
        return Some(TabStatus::Discarded);
    }
    if is_suspended_tab(tab, env) {
        return Some(TabStatus::Suspended);
    }
    if settings.whitelist().matches(&tab.url) {
        return Some(TabStatus::Whitelisted);
    }
    if settings.is_never() {
        return Some(TabStatus::Never);
    }
    None
}

/// Status of `tab` from fixed inputs only. `Active` reads the host's own
/// `tab.active` flag, so `classify` stays pure; the timer exemption in
/// [`is_protected`] instead takes the focus tracker's view, which lags the
/// host by the focus debounce after a window switch.
pub fn classify(
    tab: &Tab,
    agent_status: Option<TabStatus>,
    settings: &SuspendSettings,
    env: &Environment,
) -> TabStatus {
    if let Some(status) = host_status(tab, settings, env) {
        return status;
    }
    if let Some(status) = agent_status.filter(|s| *s != TabStatus::Normal) {
        return status;
    }
    if settings.ignore_when_charging && env.charging {
        return TabStatus::Charging;
    }
    if settings.ignore_when_offline && !env.online {
        return TabStatus::NoConnectivity;
    }
    if settings.ignore_pinned && tab.pinned {
        return TabStatus::Pinned;
    }
    if settings.ignore_audio && tab.audible {
        return TabStatus::Audible;
    }
    if settings.ignore_active_tabs && tab.active {
        return TabStatus::Active;
    }
    agent_status.unwrap_or(TabStatus::Unknown)
}
