//! Property-based tests for status classification.
//!
//! Classification is a pure function of its inputs, and the loading and
//! host-side rules take precedence over anything the agent reports.

use proptest::prelude::*;

use tabsuspend::services::status_classifier::{classify, host_status};
use tabsuspend::types::settings::{Environment, SuspendSettings};
use tabsuspend::types::status::TabStatus;
use tabsuspend::types::tab::{LoadStatus, Tab};

fn arb_url() -> impl Strategy<Value = String> {
    prop_oneof![
        "https://[a-z]{1,8}\\.com/[a-z]{0,8}",
        "http://[a-z]{1,8}\\.org",
        Just("chrome://extensions".to_string()),
        Just("file:///tmp/a.html".to_string()),
        Just("chrome-extension://tabsuspend/suspended.html#ttl=a&pos=0&uri=https://a.com".to_string()),
    ]
}

fn arb_tab() -> impl Strategy<Value = Tab> {
    (
        arb_url(),
        prop_oneof![Just(LoadStatus::Complete), Just(LoadStatus::Loading), Just(LoadStatus::Unloaded)],
        any::<(bool, bool, bool, bool)>(),
    )
        .prop_map(|(url, status, (active, pinned, audible, discarded))| {
            let mut tab = Tab::new(1, 1, &url);
            tab.status = status;
            tab.active = active;
            tab.pinned = pinned;
            tab.audible = audible;
            tab.discarded = discarded;
            tab
        })
}

fn arb_agent_status() -> impl Strategy<Value = Option<TabStatus>> {
    prop_oneof![
        Just(None),
        Just(Some(TabStatus::Normal)),
        Just(Some(TabStatus::FormInput)),
        Just(Some(TabStatus::TempWhitelist)),
    ]
}

fn arb_settings() -> impl Strategy<Value = SuspendSettings> {
    (
        any::<(bool, bool, bool, bool, bool)>(),
        prop_oneof![Just("0"), Just("1"), Just("60")],
        prop_oneof![Just(""), Just("a.com"), Just("/\\.org/")],
    )
        .prop_map(|((charging, offline, audio, pinned, active), time, whitelist)| SuspendSettings {
            ignore_when_charging: charging,
            ignore_when_offline: offline,
            ignore_audio: audio,
            ignore_pinned: pinned,
            ignore_active_tabs: active,
            suspend_time: time.to_string(),
            whitelist: whitelist.to_string(),
            ..SuspendSettings::default()
        })
}

fn arb_env() -> impl Strategy<Value = Environment> {
    any::<(bool, bool, bool)>().prop_map(|(charging, online, file_access_allowed)| Environment {
        charging,
        online,
        file_access_allowed,
        ..Environment::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig { max_global_rejects: 8192, ..ProptestConfig::with_cases(200) })]

    #[test]
    fn classification_is_pure(
        tab in arb_tab(),
        agent in arb_agent_status(),
        settings in arb_settings(),
        env in arb_env(),
    ) {
        let first = classify(&tab, agent, &settings, &env);
        let second = classify(&tab, agent, &settings, &env);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn loading_tabs_are_always_loading(
        mut tab in arb_tab(),
        agent in arb_agent_status(),
        settings in arb_settings(),
        env in arb_env(),
    ) {
        tab.status = LoadStatus::Loading;
        prop_assert_eq!(classify(&tab, agent, &settings, &env), TabStatus::Loading);
    }

    #[test]
    fn host_rules_override_the_agent(
        tab in arb_tab(),
        agent in arb_agent_status(),
        settings in arb_settings(),
        env in arb_env(),
    ) {
        if let Some(status) = host_status(&tab, &settings, &env) {
            prop_assert_eq!(classify(&tab, agent, &settings, &env), status);
        }
    }

    #[test]
    fn agent_hold_is_reported_when_host_does_not_decide(
        tab in arb_tab(),
        settings in arb_settings(),
        env in arb_env(),
    ) {
        prop_assume!(host_status(&tab, &settings, &env).is_none());
        prop_assert_eq!(
            classify(&tab, Some(TabStatus::FormInput), &settings, &env),
            TabStatus::FormInput
        );
    }
}
