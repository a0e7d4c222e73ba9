//! Unit tests for focus tracking and its debounced commit stage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tabsuspend::app::App;
use tabsuspend::host::memory::MemoryHost;
use tabsuspend::managers::focus_tracker::FocusTracker;
use tabsuspend::services::collaborators::Collaborators;
use tabsuspend::types::event::HostEvent;
use tabsuspend::types::settings::{CoreConfig, Environment, SettingKey};
use tabsuspend::types::tab::{Tab, TabId, WindowId};

fn tab(id: i64, window: i64, active: bool) -> Tab {
    let mut tab = Tab::new(id, window, &format!("https://example.com/{id}"));
    tab.index = id as usize;
    tab.active = active;
    tab
}

// === Raw focus ===

#[test]
fn test_seed_marks_active_tabs_focused_and_stationary() {
    let focus = FocusTracker::new(Duration::from_millis(500));
    focus.seed(Some(WindowId(1)), &[tab(1, 1, true), tab(5, 2, true)]);

    assert_eq!(focus.focused_window(), Some(WindowId(1)));
    assert_eq!(focus.stationary_window(), Some(WindowId(1)));
    assert_eq!(focus.focused_tab(WindowId(2)), Some(TabId(5)));
    assert_eq!(focus.stationary_tab(WindowId(1)), Some(TabId(1)));
}

#[test]
fn test_focused_tab_requires_focused_window() {
    let focus = FocusTracker::new(Duration::from_millis(500));
    focus.seed(Some(WindowId(1)), &[tab(1, 1, true), tab(5, 2, true)]);

    assert!(focus.is_current_focused_tab(&tab(1, 1, true)));
    assert!(!focus.is_current_focused_tab(&tab(5, 2, true)));
    // Still the active tab of its own window.
    assert!(focus.is_current_active_tab(&tab(5, 2, true)));
}

#[test]
fn test_unrecorded_window_falls_back_to_active_flag() {
    let focus = FocusTracker::new(Duration::from_millis(500));
    focus.record_window_focus(WindowId(3));
    assert!(focus.is_current_focused_tab(&tab(9, 3, true)));
    assert!(!focus.is_current_focused_tab(&tab(10, 3, false)));
}

#[test]
fn test_record_tab_focus_returns_previous() {
    let focus = FocusTracker::new(Duration::from_millis(500));
    assert_eq!(focus.record_tab_focus(TabId(1), WindowId(1)), None);
    assert_eq!(focus.record_tab_focus(TabId(2), WindowId(1)), Some(TabId(1)));
    assert_eq!(focus.record_tab_focus(TabId(7), WindowId(2)), None);
}

#[test]
fn test_remap_rewrites_every_slot() {
    let focus = FocusTracker::new(Duration::from_millis(500));
    focus.seed(Some(WindowId(1)), &[tab(100, 1, true)]);
    focus.remap_tab(TabId(100), TabId(101));

    assert!(!focus.references(TabId(100)));
    assert_eq!(focus.focused_tab(WindowId(1)), Some(TabId(101)));
    assert_eq!(focus.stationary_tab(WindowId(1)), Some(TabId(101)));
}

// === Debounced commit ===

#[tokio::test(start_paused = true)]
async fn test_rapid_commits_collapse_to_last() {
    let focus = FocusTracker::new(Duration::from_millis(500));
    let runs = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));

    for i in 1..=5 {
        let runs = runs.clone();
        let last = last.clone();
        focus.schedule_tab_commit(async move {
            runs.fetch_add(1, Ordering::SeqCst);
            last.store(i, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(focus.has_pending_commit());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst), 5);
    assert!(!focus.has_pending_commit());
}

#[tokio::test(start_paused = true)]
async fn test_keying_through_tabs_settles_on_the_last() {
    let host = Arc::new(MemoryHost::new());
    host.put_option(SettingKey::SuspendTime, json!("10"));
    for id in 1..=5 {
        host.insert_tab(tab(id, 1, id == 1));
    }
    host.set_last_focused_window(Some(WindowId(1)));
    let app = App::new(CoreConfig::default(), Environment::default(), Collaborators::from_host(host.clone()));
    app.startup().await;

    let coordinator = app.coordinator();
    assert!(!coordinator.timers().is_armed(TabId(1)), "focused tab is protected");

    for id in 2..=5 {
        app.dispatch(HostEvent::TabActivated {
            tab_id: TabId(id),
            window_id: WindowId(1),
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(coordinator.focus().focused_tab(WindowId(1)), Some(TabId(5)));
    assert_eq!(coordinator.focus().stationary_tab(WindowId(1)), Some(TabId(1)));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(coordinator.focus().stationary_tab(WindowId(1)), Some(TabId(5)));
    // Leaving tab 1 restarts its countdown.
    assert!(coordinator.timers().is_armed(TabId(1)));
}
