//! Unit tests for tab id remapping and retirement.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tabsuspend::app::App;
use tabsuspend::host::memory::{HostCall, MemoryHost};
use tabsuspend::managers::focus_tracker::FocusTracker;
use tabsuspend::managers::identity_remapper::IdentityRemapper;
use tabsuspend::managers::tab_state_store::TabStateStore;
use tabsuspend::services::collaborators::Collaborators;
use tabsuspend::types::event::HostEvent;
use tabsuspend::types::lifecycle::Lifecycle;
use tabsuspend::types::settings::{CoreConfig, Environment, SettingKey};
use tabsuspend::types::status::ForceLevel;
use tabsuspend::types::tab::{Tab, TabId, WindowId};

fn remapper() -> (TabStateStore, Arc<FocusTracker>, IdentityRemapper) {
    let store = TabStateStore::new();
    let focus = Arc::new(FocusTracker::new(Duration::from_millis(500)));
    let remapper = IdentityRemapper::new(store.clone(), focus.clone());
    (store, focus, remapper)
}

#[test]
fn test_remap_moves_state_and_focus() {
    let (store, focus, remapper) = remapper();
    let mut tab = Tab::new(100, 1, "https://example.com");
    tab.active = true;
    focus.seed(Some(WindowId(1)), &[tab]);
    store.set(TabId(100), |s| s.temp_whitelist_on_reload = true);

    remapper.remap(TabId(101), TabId(100));

    assert!(!store.contains(TabId(100)));
    assert_eq!(store.get(TabId(101), |s| s.temp_whitelist_on_reload), Some(true));
    assert_eq!(focus.focused_tab(WindowId(1)), Some(TabId(101)));
    assert!(!focus.references(TabId(100)));
}

#[test]
fn test_remap_to_same_id_is_a_no_op() {
    let (store, _focus, remapper) = remapper();
    store.set(TabId(5), |s| s.discard_handled = true);
    remapper.remap(TabId(5), TabId(5));
    assert_eq!(store.get(TabId(5), |s| s.discard_handled), Some(true));
}

#[test]
fn test_remap_of_unknown_id_leaves_target_alone() {
    let (store, _focus, remapper) = remapper();
    store.set(TabId(7), |s| s.discard_handled = true);
    remapper.remap(TabId(7), TabId(6));
    assert_eq!(store.tab_ids(), vec![TabId(7)]);
}

#[test]
fn test_retire_clears_state_and_focus_slots() {
    let (store, focus, remapper) = remapper();
    let mut tab = Tab::new(3, 2, "https://example.com");
    tab.active = true;
    focus.seed(Some(WindowId(2)), &[tab]);
    store.set(TabId(3), |s| s.set_autodiscardable = true);

    remapper.retire(TabId(3));

    assert!(!store.contains(TabId(3)));
    assert!(!focus.references(TabId(3)));
    assert_eq!(focus.snapshot().focused_tab_by_window.get(&WindowId(2)), Some(&None));
}

#[tokio::test(start_paused = true)]
async fn test_pending_timer_follows_replaced_id() {
    let host = Arc::new(MemoryHost::new());
    host.put_option(SettingKey::SuspendTime, json!(1));
    let mut focused = Tab::new(1, 1, "https://example.com/a");
    focused.active = true;
    host.insert_tab(focused);
    host.insert_tab(Tab::new(100, 1, "https://example.com/b"));
    host.set_last_focused_window(Some(WindowId(1)));

    let app = App::new(CoreConfig::default(), Environment::default(), Collaborators::from_host(host.clone()));
    app.startup().await;
    let coordinator = app.coordinator();
    assert!(coordinator.timers().is_armed(TabId(100)));

    tokio::time::sleep(Duration::from_secs(30)).await;
    host.replace_tab(TabId(100), TabId(101));
    app.dispatch(HostEvent::TabReplaced {
        added_tab_id: TabId(101),
        removed_tab_id: TabId(100),
    })
    .await;
    assert!(coordinator.timers().is_armed(TabId(101)));
    assert!(!coordinator.store().contains(TabId(100)));

    tokio::time::sleep(Duration::from_secs(31)).await;

    let queued: Vec<HostCall> = host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::Queue { .. }))
        .collect();
    assert_eq!(
        queued,
        vec![HostCall::Queue {
            tab_id: TabId(101),
            force_level: ForceLevel::Timer
        }]
    );
    assert_eq!(coordinator.store().lifecycle(TabId(101)), Lifecycle::Queued(ForceLevel::Timer));
    assert!(!coordinator.store().contains(TabId(100)));
}
