//! User commands and the external suspend/unsuspend API.

use serde_json::Value;

use crate::managers::suspend_coordinator::SuspendCoordinator;
use crate::services::{status_classifier, suspended_url, whitelist};
use crate::types::errors::CommandError;
use crate::types::event::{Command, ExternalRequest};
use crate::types::settings::SettingKey;
use crate::types::status::{ForceLevel, TabStatus};
use crate::types::tab::{CreateProps, Tab, TabId, TabPatch, TabQuery, WindowId};

fn force_level(force: bool) -> ForceLevel {
    if force {
        ForceLevel::Manual
    } else {
        ForceLevel::Soft
    }
}

impl SuspendCoordinator {
    async fn active_tab_in(&self, window_id: WindowId) -> Option<Tab> {
        self.collaborators()
            .tabs
            .query(TabQuery {
                window_id: Some(window_id),
                active: Some(true),
                ..TabQuery::default()
            })
            .await
            .into_iter()
            .next()
    }

    /// The tab commands act on: the focused window's active tab, then the
    /// last focused window's, then the stationary window's, then the
    /// stationary tab itself.
    pub async fn current_active_tab(&self) -> Option<Tab> {
        if let Some(window_id) = self.focus().focused_window() {
            if let Some(tab) = self.active_tab_in(window_id).await {
                return Some(tab);
            }
        }
        if let Some(window_id) = self.collaborators().tabs.last_focused_window().await {
            if let Some(tab) = self.active_tab_in(window_id).await {
                return Some(tab);
            }
        }
        let window_id = self.focus().stationary_window()?;
        if let Some(tab) = self.active_tab_in(window_id).await {
            return Some(tab);
        }
        let tab_id = self.focus().stationary_tab(window_id)?;
        self.collaborators().tabs.get(tab_id).await
    }

    async fn selected_tabs(&self) -> Vec<Tab> {
        let Some(window_id) = self.collaborators().tabs.last_focused_window().await else {
            return Vec::new();
        };
        self.collaborators()
            .tabs
            .query(TabQuery {
                window_id: Some(window_id),
                highlighted: Some(true),
                ..TabQuery::default()
            })
            .await
    }

    fn is_suspended(&self, tab: &Tab) -> bool {
        status_classifier::is_suspended_tab(tab, &self.environment())
    }

    pub async fn handle_command(&self, command: Command) {
        tracing::debug!(?command, "Handling command");
        match command {
            Command::ToggleSuspendHighlighted => {
                if let Some(tab) = self.current_active_tab().await {
                    if self.is_suspended(&tab) {
                        self.unsuspend(&tab).await;
                    } else {
                        self.queue().request(&tab, ForceLevel::Manual).await;
                    }
                }
            }
            Command::SuspendHighlighted => {
                if let Some(tab) = self.current_active_tab().await {
                    self.queue().request(&tab, ForceLevel::Manual).await;
                }
            }
            Command::UnsuspendHighlighted => {
                if let Some(tab) = self.current_active_tab().await {
                    if self.is_suspended(&tab) {
                        self.unsuspend(&tab).await;
                    }
                }
            }
            Command::ToggleTempWhitelistHighlighted => self.toggle_temp_whitelist().await,
            Command::WhitelistHighlighted { include_path } => self.whitelist_active_tab(include_path).await,
            Command::UnwhitelistHighlighted => self.unwhitelist_active_tab().await,
            Command::SuspendSelected => {
                for tab in self.selected_tabs().await {
                    self.queue().request(&tab, ForceLevel::Manual).await;
                }
            }
            Command::UnsuspendSelected => {
                for tab in self.selected_tabs().await {
                    self.queue().cancel(&tab).await;
                    if self.is_suspended(&tab) {
                        self.unsuspend(&tab).await;
                    }
                }
            }
            Command::SuspendAllInWindow { force } => self.suspend_window(force_level(force)).await,
            Command::UnsuspendAllInWindow => self.unsuspend_window().await,
            Command::SuspendAllWindows { force } => {
                let level = force_level(force);
                for tab in self.collaborators().tabs.query(TabQuery::all()).await {
                    self.queue().request(&tab, level).await;
                }
            }
            Command::UnsuspendAllWindows => self.unsuspend_all_windows().await,
            Command::OpenLinkInSuspendedTab { parent_tab_id, url } => {
                self.open_link_in_suspended_tab(parent_tab_id, &url).await;
            }
        }
    }

    /// Queues every inactive tab of the active tab's window.
    async fn suspend_window(&self, level: ForceLevel) {
        let Some(active) = self.current_active_tab().await else {
            tracing::warn!("Could not determine the currently active window");
            return;
        };
        let tabs = self
            .collaborators()
            .tabs
            .query(TabQuery::in_window(active.window_id))
            .await;
        for tab in tabs.iter().filter(|tab| !tab.active) {
            self.queue().request(tab, level).await;
        }
    }

    async fn unsuspend_window(&self) {
        let Some(active) = self.current_active_tab().await else {
            tracing::warn!("Could not determine the currently active window");
            return;
        };
        let settings = self.settings().await;
        let env = self.environment();
        let tabs = self
            .collaborators()
            .tabs
            .query(TabQuery::in_window(active.window_id))
            .await;
        for tab in &tabs {
            self.queue().cancel(tab).await;
            if status_classifier::is_suspended_tab(tab, &env) {
                self.unsuspend(tab).await;
            } else if status_classifier::is_normal_tab(tab, &env, false) && !tab.active {
                self.arm_timer(tab, &settings);
            }
        }
    }

    /// Unsuspending steals window focus, so tabs of the last focused window
    /// go last.
    async fn unsuspend_all_windows(&self) {
        let current_window = self.collaborators().tabs.last_focused_window().await;
        let settings = self.settings().await;
        let env = self.environment();
        let mut deferred = Vec::new();
        for tab in self.collaborators().tabs.query(TabQuery::all()).await {
            self.queue().cancel(&tab).await;
            if status_classifier::is_suspended_tab(&tab, &env) {
                if Some(tab.window_id) == current_window {
                    deferred.push(tab);
                } else {
                    self.unsuspend(&tab).await;
                }
            } else if status_classifier::is_normal_tab(&tab, &env, false) {
                self.arm_timer(&tab, &settings);
            }
        }
        for tab in &deferred {
            self.unsuspend(tab).await;
        }
    }

    async fn toggle_temp_whitelist(&self) {
        let Some(tab) = self.current_active_tab().await else {
            return;
        };
        if self.is_suspended(&tab) {
            self.unsuspend(&tab).await;
            return;
        }
        if !status_classifier::is_normal_tab(&tab, &self.environment(), true) {
            return;
        }
        match self.calculate_status(&tab, None).await {
            TabStatus::Active | TabStatus::Normal => self.set_temp_whitelist(&tab, true).await,
            TabStatus::TempWhitelist | TabStatus::FormInput => self.set_temp_whitelist(&tab, false).await,
            status => tracing::debug!(tab_id = %tab.id, %status, "Temporary whitelist not applicable"),
        }
    }

    async fn set_temp_whitelist(&self, tab: &Tab, enabled: bool) {
        let agent_status = match self.send_temp_whitelist(tab.id, enabled).await {
            Ok(info) => info.status,
            Err(e) => {
                tracing::warn!(tab_id = %tab.id, enabled, error = %e, "Failed to toggle temporary whitelist");
                None
            }
        };
        let status = self.refresh_icon(tab, agent_status).await;
        let holds = status == TabStatus::TempWhitelist;
        if holds == tab.auto_discardable {
            self.collaborators()
                .tabs
                .update(tab.id, TabPatch::auto_discardable(!holds))
                .await;
        }
    }

    async fn save_whitelist(&self, raw: String) {
        self.collaborators()
            .settings
            .set_option(SettingKey::Whitelist, Value::String(raw))
            .await;
    }

    async fn whitelist_active_tab(&self, include_path: bool) {
        let Some(tab) = self.current_active_tab().await else {
            return;
        };
        let env = self.environment();
        let current = self.settings().await.whitelist;

        if status_classifier::is_suspended_tab(&tab, &env) {
            let Some(original) = suspended_url::original_url(&tab.url) else {
                return;
            };
            let rule = whitelist::root_url(&original, include_path);
            self.save_whitelist(whitelist::add_rule(&current, &rule)).await;
            self.unsuspend(&tab).await;
        } else if status_classifier::is_normal_tab(&tab, &env, false) {
            let rule = whitelist::root_url(&tab.url, include_path);
            self.save_whitelist(whitelist::add_rule(&current, &rule)).await;
            self.refresh_icon(&tab, None).await;
        }
    }

    async fn unwhitelist_active_tab(&self) {
        let Some(tab) = self.current_active_tab().await else {
            return;
        };
        let current = self.settings().await.whitelist;
        self.save_whitelist(whitelist::remove_matching(&current, &tab.url))
            .await;
        self.refresh_icon(&tab, None).await;
    }

    /// Opens `url` in a background tab next to its parent, after any tabs the
    /// parent already opened, and queues it for suspension.
    async fn open_link_in_suspended_tab(&self, parent_tab_id: TabId, url: &str) {
        let tabs = &self.collaborators().tabs;
        let Some(parent) = tabs.get(parent_tab_id).await else {
            tracing::debug!(tab_id = %parent_tab_id, "Parent tab is gone");
            return;
        };
        let siblings = tabs.query(TabQuery::in_window(parent.window_id)).await;
        let mut index = parent.index + 1;
        while siblings
            .iter()
            .any(|tab| tab.index == index && tab.opener_tab_id == Some(parent.id))
        {
            index += 1;
        }
        let props = CreateProps {
            url: url.to_string(),
            window_id: Some(parent.window_id),
            index: Some(index),
            opener_tab_id: Some(parent.id),
            active: false,
        };
        match tabs.create(props).await {
            Some(tab) => self.queue().request(&tab, ForceLevel::Manual).await,
            None => tracing::warn!(url, "Failed to open link in a new tab"),
        }
    }

    /// Entry point for requests from other extensions.
    pub async fn handle_external_request(&self, request: ExternalRequest) -> Result<(), CommandError> {
        tracing::debug!(?request, "External request");
        let suspend = match request.action.as_str() {
            "suspend" => true,
            "unsuspend" => false,
            other => return Err(CommandError::UnknownAction(other.to_string())),
        };

        let tab = match &request.tab_id {
            Some(raw) => {
                let tab_id = raw
                    .as_i64()
                    .map(TabId)
                    .ok_or_else(|| CommandError::InvalidTabId(raw.to_string()))?;
                self.collaborators()
                    .tabs
                    .get(tab_id)
                    .await
                    .ok_or(CommandError::TabNotFound(tab_id))?
            }
            None => self
                .current_active_tab()
                .await
                .ok_or(CommandError::NoTargetTab)?,
        };

        if suspend {
            // Any installation's placeholder counts as suspended here.
            if self.is_suspended(&tab) || suspended_url::is_any_suspended_url(&tab.url) {
                return Err(CommandError::AlreadySuspended(tab.id));
            }
            self.queue().request(&tab, ForceLevel::Manual).await;
        } else {
            if !self.is_suspended(&tab) {
                return Err(CommandError::NotSuspended(tab.id));
            }
            self.unsuspend(&tab).await;
        }
        Ok(())
    }
}
