//! Unit tests for status classification and its rule precedence.

use rstest::rstest;

use tabsuspend::services::status_classifier::{classify, is_normal_tab, is_protected, is_special_tab};
use tabsuspend::services::suspended_url;
use tabsuspend::types::settings::{Environment, SuspendSettings};
use tabsuspend::types::status::TabStatus;
use tabsuspend::types::tab::{LoadStatus, ScrollPosition, Tab};

fn web_tab() -> Tab {
    Tab::new(1, 1, "https://example.com/article")
}

fn suspended_tab(env: &Environment) -> Tab {
    let url = suspended_url::build(
        &env.extension_origin,
        "Article",
        ScrollPosition::default(),
        "https://example.com/article",
    );
    Tab::new(2, 1, &url)
}

// === Host-side rules ===

#[rstest]
#[case("chrome://settings", TabStatus::Special)]
#[case("about:blank", TabStatus::Special)]
#[case("https://chromewebstore.google.com/detail/x", TabStatus::Special)]
#[case("chrome-extension://someoneelse/options.html", TabStatus::Special)]
#[case("file:///home/me/notes.txt", TabStatus::BlockedFile)]
#[case("https://example.com", TabStatus::Unknown)]
fn test_url_rules(#[case] url: &str, #[case] expected: TabStatus) {
    let tab = Tab::new(1, 1, url);
    let status = classify(&tab, None, &SuspendSettings::default(), &Environment::default());
    assert_eq!(status, expected, "url={url}");
}

#[test]
fn test_file_tab_with_access_is_normal() {
    let env = Environment {
        file_access_allowed: true,
        ..Environment::default()
    };
    let tab = Tab::new(1, 1, "file:///home/me/notes.txt");
    assert!(is_normal_tab(&tab, &env, false));
    assert_eq!(
        classify(&tab, Some(TabStatus::Normal), &SuspendSettings::default(), &env),
        TabStatus::Normal
    );
}

#[test]
fn test_loading_beats_everything() {
    let mut tab = Tab::new(1, 1, "chrome://newtab");
    tab.status = LoadStatus::Loading;
    tab.discarded = true;
    let status = classify(&tab, Some(TabStatus::FormInput), &SuspendSettings::default(), &Environment::default());
    assert_eq!(status, TabStatus::Loading);
}

#[test]
fn test_suspended_placeholder_is_not_special() {
    let env = Environment::default();
    let tab = suspended_tab(&env);
    assert!(!is_special_tab(&tab, &env));
    assert!(!is_normal_tab(&tab, &env, false));
    assert_eq!(
        classify(&tab, None, &SuspendSettings::default(), &env),
        TabStatus::Suspended
    );
}

#[test]
fn test_discarded_is_reported_before_whitelist() {
    let mut tab = web_tab();
    tab.discarded = true;
    let settings = SuspendSettings {
        whitelist: "example.com".to_string(),
        ..SuspendSettings::default()
    };
    assert_eq!(
        classify(&tab, None, &settings, &Environment::default()),
        TabStatus::Discarded
    );
    assert!(!is_normal_tab(&tab, &Environment::default(), true));
    assert!(is_normal_tab(&tab, &Environment::default(), false));
}

#[test]
fn test_whitelist_beats_never() {
    let settings = SuspendSettings {
        whitelist: "/example\\.com/".to_string(),
        suspend_time: "0".to_string(),
        ..SuspendSettings::default()
    };
    assert_eq!(
        classify(&web_tab(), None, &settings, &Environment::default()),
        TabStatus::Whitelisted
    );
}

// === Agent and environment rules ===

#[rstest]
#[case(TabStatus::FormInput)]
#[case(TabStatus::TempWhitelist)]
fn test_agent_hold_beats_pinned_and_active(#[case] agent: TabStatus) {
    let mut tab = web_tab();
    tab.pinned = true;
    tab.active = true;
    let status = classify(&tab, Some(agent), &SuspendSettings::default(), &Environment::default());
    assert_eq!(status, agent);
}

#[test]
fn test_charging_before_offline() {
    let settings = SuspendSettings {
        ignore_when_charging: true,
        ignore_when_offline: true,
        ..SuspendSettings::default()
    };
    let env = Environment {
        charging: true,
        online: false,
        ..Environment::default()
    };
    assert_eq!(
        classify(&web_tab(), Some(TabStatus::Normal), &settings, &env),
        TabStatus::Charging
    );
}

#[rstest]
#[case(true, false, false, TabStatus::Pinned)]
#[case(false, true, false, TabStatus::Audible)]
#[case(false, false, true, TabStatus::Active)]
#[case(true, true, true, TabStatus::Pinned)]
#[case(false, false, false, TabStatus::Normal)]
fn test_tab_flags_in_order(
    #[case] pinned: bool,
    #[case] audible: bool,
    #[case] active: bool,
    #[case] expected: TabStatus,
) {
    let mut tab = web_tab();
    tab.pinned = pinned;
    tab.audible = audible;
    tab.active = active;
    let status = classify(&tab, Some(TabStatus::Normal), &SuspendSettings::default(), &Environment::default());
    assert_eq!(status, expected);
}

#[test]
fn test_flags_ignored_when_settings_off() {
    let mut tab = web_tab();
    tab.pinned = true;
    tab.audible = true;
    tab.active = true;
    let settings = SuspendSettings {
        ignore_pinned: false,
        ignore_audio: false,
        ignore_active_tabs: false,
        ..SuspendSettings::default()
    };
    assert_eq!(
        classify(&tab, Some(TabStatus::Normal), &settings, &Environment::default()),
        TabStatus::Normal
    );
    assert!(!is_protected(&tab, true, &settings));
}

#[test]
fn test_missing_agent_status_is_unknown() {
    assert_eq!(
        classify(&web_tab(), None, &SuspendSettings::default(), &Environment::default()),
        TabStatus::Unknown
    );
}

// === Timer protection ===

#[test]
fn test_protection_uses_callers_view_of_activity() {
    let tab = web_tab();
    let settings = SuspendSettings::default();
    assert!(is_protected(&tab, true, &settings));
    assert!(!is_protected(&tab, false, &settings));
}

#[test]
fn test_classify_reads_host_active_flag() {
    let settings = SuspendSettings::default();
    let mut tab = web_tab();
    tab.active = false;
    // The focus tracker may still hold this tab as active; classify ignores that.
    assert!(is_protected(&tab, true, &settings));
    assert_eq!(
        classify(&tab, Some(TabStatus::Normal), &settings, &Environment::default()),
        TabStatus::Normal
    );
    tab.active = true;
    assert_eq!(
        classify(&tab, Some(TabStatus::Normal), &settings, &Environment::default()),
        TabStatus::Active
    );
}
