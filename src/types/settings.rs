use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::whitelist::Whitelist;
use crate::types::errors::SettingsError;

/// Roughly a century; larger values cannot be represented as a timer.
const MAX_SUSPEND_MINUTES: f64 = 60.0 * 24.0 * 365.0 * 100.0;

/// Keys understood by the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    SuspendTime,
    IgnoreWhenCharging,
    IgnoreWhenOffline,
    IgnoreAudio,
    IgnorePinned,
    IgnoreActiveTabs,
    IgnoreForms,
    UnsuspendOnFocus,
    DiscardAfterSuspend,
    ClaimByDefault,
    Whitelist,
}

impl SettingKey {
    pub const ALL: [SettingKey; 11] = [
        SettingKey::SuspendTime,
        SettingKey::IgnoreWhenCharging,
        SettingKey::IgnoreWhenOffline,
        SettingKey::IgnoreAudio,
        SettingKey::IgnorePinned,
        SettingKey::IgnoreActiveTabs,
        SettingKey::IgnoreForms,
        SettingKey::UnsuspendOnFocus,
        SettingKey::DiscardAfterSuspend,
        SettingKey::ClaimByDefault,
        SettingKey::Whitelist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::SuspendTime => "suspendTime",
            SettingKey::IgnoreWhenCharging => "ignoreWhenCharging",
            SettingKey::IgnoreWhenOffline => "ignoreWhenOffline",
            SettingKey::IgnoreAudio => "ignoreAudio",
            SettingKey::IgnorePinned => "ignorePinned",
            SettingKey::IgnoreActiveTabs => "ignoreActiveTabs",
            SettingKey::IgnoreForms => "ignoreForms",
            SettingKey::UnsuspendOnFocus => "unsuspendOnFocus",
            SettingKey::DiscardAfterSuspend => "discardAfterSuspend",
            SettingKey::ClaimByDefault => "claimByDefault",
            SettingKey::Whitelist => "whitelist",
        }
    }
}

/// Typed snapshot of the user's suspension settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendSettings {
    /// Minutes of inactivity before auto-suspend; `"0"` means never.
    pub suspend_time: String,
    pub ignore_when_charging: bool,
    pub ignore_when_offline: bool,
    pub ignore_audio: bool,
    pub ignore_pinned: bool,
    pub ignore_active_tabs: bool,
    pub ignore_forms: bool,
    pub unsuspend_on_focus: bool,
    pub discard_after_suspend: bool,
    pub claim_by_default: bool,
    /// Whitespace-separated whitelist rules.
    pub whitelist: String,
}

impl Default for SuspendSettings {
    fn default() -> Self {
        Self {
            suspend_time: "60".to_string(),
            ignore_when_charging: false,
            ignore_when_offline: false,
            ignore_audio: true,
            ignore_pinned: true,
            ignore_active_tabs: true,
            ignore_forms: true,
            unsuspend_on_focus: false,
            discard_after_suspend: false,
            claim_by_default: false,
            whitelist: String::new(),
        }
    }
}

impl SuspendSettings {
    /// Builds a snapshot from raw store values. Missing keys keep their
    /// default; values of the wrong type are reported and skipped.
    pub fn from_options<I>(options: I) -> (Self, Vec<SettingsError>)
    where
        I: IntoIterator<Item = (SettingKey, Option<Value>)>,
    {
        let mut current = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => return (Self::default(), Vec::new()),
        };
        let mut errors = Vec::new();

        for (key, value) in options {
            let Some(value) = value else { continue };
            // The store may hold the delay as a number or a string.
            let value = match (key, value) {
                (SettingKey::SuspendTime, Value::Number(n)) => Value::String(n.to_string()),
                (_, v) => v,
            };

            let mut candidate = current.clone();
            candidate.insert(key.as_str().to_string(), value);
            match serde_json::from_value::<Self>(Value::Object(candidate.clone())) {
                Ok(_) => current = candidate,
                Err(e) => errors.push(SettingsError::InvalidValue {
                    key: key.as_str().to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        let settings = serde_json::from_value(Value::Object(current)).unwrap_or_default();
        (settings, errors)
    }

    /// Auto-suspend delay. `Ok(None)` when suspension is disabled ("never" or
    /// non-positive).
    pub fn suspend_delay(&self) -> Result<Option<Duration>, SettingsError> {
        let minutes: f64 = self
            .suspend_time
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidSuspendTime(self.suspend_time.clone()))?;
        if !minutes.is_finite() || minutes > MAX_SUSPEND_MINUTES {
            return Err(SettingsError::InvalidSuspendTime(self.suspend_time.clone()));
        }
        if minutes <= 0.0 {
            return Ok(None);
        }
        Ok(Some(Duration::from_secs_f64(minutes * 60.0)))
    }

    /// Exactly the "never suspend" choice, as opposed to a broken value.
    pub fn is_never(&self) -> bool {
        self.suspend_time.trim() == "0"
    }

    pub fn whitelist(&self) -> Whitelist {
        Whitelist::parse(&self.whitelist)
    }
}

/// Facts about the host environment that influence classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    /// Origin of this extension's pages, e.g. `chrome-extension://abcdef`.
    pub extension_origin: String,
    pub charging: bool,
    pub online: bool,
    /// Whether the user granted access to `file://` URLs.
    pub file_access_allowed: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            extension_origin: "chrome-extension://tabsuspend".to_string(),
            charging: false,
            online: true,
            file_access_allowed: false,
        }
    }
}

/// Timing knobs of the core. All durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// How long focus must rest on a tab or window before it is stationary.
    pub focus_delay_ms: u64,
    /// Upper bound on any agent round-trip.
    pub handshake_timeout_ms: u64,
    /// Delay before re-checking a freshly initialised suspended tab.
    pub suspended_check_delay_ms: u64,
    /// Delay before checking a previously focused suspended tab for discard.
    pub discard_check_delay_ms: u64,
    /// Delay before checking a suspended tab that was re-opened in the background.
    pub reopened_check_delay_ms: u64,
    /// Debounce for session snapshots.
    pub session_save_delay_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            focus_delay_ms: 500,
            handshake_timeout_ms: 5_000,
            suspended_check_delay_ms: 3_000,
            discard_check_delay_ms: 1_000,
            reopened_check_delay_ms: 5_000,
            session_save_delay_ms: 1_000,
        }
    }
}

impl CoreConfig {
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn suspended_check_delay(&self) -> Duration {
        Duration::from_millis(self.suspended_check_delay_ms)
    }

    pub fn discard_check_delay(&self) -> Duration {
        Duration::from_millis(self.discard_check_delay_ms)
    }

    pub fn reopened_check_delay(&self) -> Duration {
        Duration::from_millis(self.reopened_check_delay_ms)
    }

    pub fn session_save_delay(&self) -> Duration {
        Duration::from_millis(self.session_save_delay_ms)
    }
}
