//! Unit tests for the per-tab state store.

use tabsuspend::managers::tab_state_store::TabStateStore;
use tabsuspend::types::lifecycle::{Lifecycle, LifecycleEvent};
use tabsuspend::types::status::{ForceLevel, SuspendReason};
use tabsuspend::types::tab::TabId;

// === Read and write ===

#[test]
fn test_unknown_tab_reads_as_absent() {
    let store = TabStateStore::new();
    assert_eq!(store.get(TabId(9), |s| s.temp_whitelist_on_reload), None);
    assert_eq!(store.lifecycle(TabId(9)), Lifecycle::Normal);
    assert!(!store.contains(TabId(9)));
}

#[test]
fn test_set_creates_record_lazily() {
    let store = TabStateStore::new();
    store.set(TabId(1), |s| s.unloaded_url = Some("chrome-extension://x/suspended.html".into()));
    assert!(store.contains(TabId(1)));
    assert_eq!(
        store.get(TabId(1), |s| s.unloaded_url.clone()).flatten().as_deref(),
        Some("chrome-extension://x/suspended.html")
    );
}

#[test]
fn test_emptied_record_is_dropped() {
    let store = TabStateStore::new();
    store.set(TabId(1), |s| s.discard_handled = true);
    store.set(TabId(1), |s| s.discard_handled = false);
    assert!(!store.contains(TabId(1)));
    assert!(store.is_empty());

    // A write that records nothing leaves no record behind.
    store.set(TabId(2), |_| ());
    assert_eq!(store.len(), 0);
}

#[test]
fn test_clones_share_the_map() {
    let store = TabStateStore::new();
    let other = store.clone();
    store.set(TabId(4), |s| s.set_autodiscardable = true);
    assert!(other.contains(TabId(4)));
}

// === Clear ===

#[test]
fn test_clear_returns_final_values_and_is_idempotent() {
    let store = TabStateStore::new();
    store.set(TabId(3), |s| {
        s.history_url_to_remove = Some("old".into());
        s.suspend_reason = Some(SuspendReason::Manual);
    });

    let removed = store.clear(TabId(3)).expect("state was recorded");
    assert_eq!(removed.history_url_to_remove.as_deref(), Some("old"));
    assert_eq!(removed.suspend_reason, Some(SuspendReason::Manual));
    assert!(store.clear(TabId(3)).is_none());
    assert!(!store.contains(TabId(3)));
}

#[test]
fn test_clear_of_unknown_tab_is_a_no_op() {
    let store = TabStateStore::new();
    store.set(TabId(1), |s| s.discard_handled = true);
    assert!(store.clear(TabId(2)).is_none());
    assert_eq!(store.tab_ids(), vec![TabId(1)]);
}

// === Lifecycle ===

#[test]
fn test_advance_follows_state_table() {
    let store = TabStateStore::new();
    let id = TabId(5);
    assert_eq!(store.advance(id, LifecycleEvent::Queue(ForceLevel::Timer)), Lifecycle::Queued(ForceLevel::Timer));
    assert_eq!(store.advance(id, LifecycleEvent::SuspendStarted), Lifecycle::Suspending);
    assert_eq!(store.advance(id, LifecycleEvent::SuspendCommitted), Lifecycle::Suspended);
    assert_eq!(store.lifecycle(id), Lifecycle::Suspended);
}

#[test]
fn test_invalid_transition_resyncs_to_host_state() {
    let store = TabStateStore::new();
    let id = TabId(6);
    // Committed without the core having seen the start.
    assert_eq!(store.advance(id, LifecycleEvent::SuspendCommitted), Lifecycle::Suspended);
    // A discarded tab that starts loading again.
    store.advance(TabId(7), LifecycleEvent::Discarded);
    assert_eq!(store.advance(TabId(7), LifecycleEvent::LoadStarted), Lifecycle::Loading);
}

#[test]
fn test_returning_to_normal_drops_record() {
    let store = TabStateStore::new();
    let id = TabId(8);
    store.advance(id, LifecycleEvent::Queue(ForceLevel::Soft));
    assert!(store.contains(id));
    store.advance(id, LifecycleEvent::Unqueue);
    assert!(!store.contains(id));
}

#[test]
fn test_tab_ids_are_sorted() {
    let store = TabStateStore::new();
    for id in [30, 10, 20] {
        store.set(TabId(id), |s| s.discard_handled = true);
    }
    assert_eq!(store.tab_ids(), vec![TabId(10), TabId(20), TabId(30)]);
}
