use std::time::Duration;

use tabsuspend::types::errors::*;
use tabsuspend::types::lifecycle::{Lifecycle, LifecycleEvent};
use tabsuspend::types::tab::TabId;

// === HandshakeError Tests ===

#[test]
fn test_handshake_unreachable_display() {
    let err = HandshakeError::Unreachable {
        tab_id: TabId(7),
        reason: "no receiver".to_string(),
    };
    assert_eq!(err.to_string(), "Agent unreachable in tab 7: no receiver");
    assert_eq!(err.tab_id(), TabId(7));
}

#[test]
fn test_handshake_timeout_display() {
    let err = HandshakeError::Timeout {
        tab_id: TabId(3),
        timeout: Duration::from_secs(5),
    };
    assert_eq!(err.to_string(), "Agent in tab 3 did not respond within 5s");
}

#[test]
fn test_handshake_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(HandshakeError::Rejected {
        tab_id: TabId(1),
        reason: "bad".to_string(),
    });
    assert!(err.source().is_none());
}

// === CommandError Tests ===

#[test]
fn test_command_error_messages() {
    assert_eq!(
        CommandError::UnknownAction("pause".to_string()).to_string(),
        "Unknown request action: pause"
    );
    assert_eq!(
        CommandError::TabNotFound(TabId(42)).to_string(),
        "No tab found with id: 42"
    );
    assert_eq!(CommandError::NoTargetTab.to_string(), "Failed to find a target tab");
    assert_eq!(
        CommandError::AlreadySuspended(TabId(2)).to_string(),
        "Tab is already suspended: 2"
    );
    assert_eq!(
        CommandError::NotSuspended(TabId(2)).to_string(),
        "Tab is not suspended: 2"
    );
}

// === TransitionError Tests ===

#[test]
fn test_transition_error_names_state_and_event() {
    let err = TransitionError::Invalid {
        from: Lifecycle::Discarded,
        event: LifecycleEvent::LoadCompleted,
    };
    assert_eq!(
        err.to_string(),
        "Invalid lifecycle transition: loadCompleted from discarded"
    );
}

// === SettingsError Tests ===

#[test]
fn test_settings_error_display() {
    let err = SettingsError::InvalidSuspendTime("soon".to_string());
    assert_eq!(err.to_string(), "Invalid suspend time: \"soon\"");
}

// === ReplayError Tests ===

#[test]
fn test_replay_parse_error_keeps_source() {
    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = ReplayError::Parse { line: 3, source };
    assert!(err.to_string().starts_with("Replay parse error on line 3:"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_replay_io_error_from_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
    let err: ReplayError = io.into();
    assert_eq!(err.to_string(), "Replay I/O error: closed");
}
