use std::fmt;

use serde::{Deserialize, Serialize};

/// Suspension-relevant status of a tab. Drives both the toolbar icon and
/// whether a tab may be suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabStatus {
    Loading,
    BlockedFile,
    Special,
    Discarded,
    Suspended,
    Whitelisted,
    Never,
    FormInput,
    TempWhitelist,
    Charging,
    NoConnectivity,
    Pinned,
    Audible,
    Active,
    Normal,
    Unknown,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::Loading => "loading",
            TabStatus::BlockedFile => "blockedFile",
            TabStatus::Special => "special",
            TabStatus::Discarded => "discarded",
            TabStatus::Suspended => "suspended",
            TabStatus::Whitelisted => "whitelisted",
            TabStatus::Never => "never",
            TabStatus::FormInput => "formInput",
            TabStatus::TempWhitelist => "tempWhitelist",
            TabStatus::Charging => "charging",
            TabStatus::NoConnectivity => "noConnectivity",
            TabStatus::Pinned => "pinned",
            TabStatus::Audible => "audible",
            TabStatus::Active => "active",
            TabStatus::Normal => "normal",
            TabStatus::Unknown => "unknown",
        }
    }

    /// Whether the icon should show suspension as running for this tab.
    pub fn is_suspension_active(&self) -> bool {
        matches!(self, TabStatus::Normal | TabStatus::Active)
    }

    /// Statuses an in-page agent reports that pause suspension of its tab.
    pub fn is_agent_hold(&self) -> bool {
        matches!(self, TabStatus::FormInput | TabStatus::TempWhitelist)
    }
}

impl fmt::Display for TabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a suspension request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForceLevel {
    /// Suspend regardless of exemptions.
    Manual = 1,
    /// Suspend unless whitelisted or otherwise exempt.
    Soft = 2,
    /// Raised by an expired auto-suspend timer.
    Timer = 3,
}

impl ForceLevel {
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Low-priority requests are dropped when the user returns to the tab.
    pub fn is_low(self) -> bool {
        self.level() > 1
    }

    pub fn reason(self) -> SuspendReason {
        match self {
            ForceLevel::Timer => SuspendReason::AutoTimer,
            ForceLevel::Manual | ForceLevel::Soft => SuspendReason::Manual,
        }
    }
}

/// Why a tab was (or is about to be) suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuspendReason {
    Manual,
    AutoTimer,
    Discarded,
}
