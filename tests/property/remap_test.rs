//! Property-based tests for identity remapping.
//!
//! For any chain of id replacements, everything recorded under the first id
//! ends up under the last one and nothing refers to an intermediate id.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use tabsuspend::managers::focus_tracker::FocusTracker;
use tabsuspend::managers::identity_remapper::IdentityRemapper;
use tabsuspend::managers::tab_state_store::TabStateStore;
use tabsuspend::types::tab::{Tab, TabId, WindowId};

fn arb_chain() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1i64..10_000, 2..12)
        .prop_map(|ids: BTreeSet<i64>| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn chain_of_remaps_lands_on_last_id(chain in arb_chain()) {
        let store = TabStateStore::new();
        let focus = Arc::new(FocusTracker::new(Duration::from_millis(500)));
        let remapper = IdentityRemapper::new(store.clone(), focus.clone());

        let first = TabId(chain[0]);
        let mut tab = Tab::new(first.0, 1, "https://example.com");
        tab.active = true;
        focus.seed(Some(WindowId(1)), &[tab]);
        store.set(first, |s| s.unloaded_url = Some("marker".to_string()));

        for pair in chain.windows(2) {
            remapper.remap(TabId(pair[1]), TabId(pair[0]));
        }

        let last = TabId(chain[chain.len() - 1]);
        prop_assert_eq!(store.tab_ids(), vec![last]);
        prop_assert_eq!(
            store.get(last, |s| s.unloaded_url.clone()).flatten(),
            Some("marker".to_string())
        );
        prop_assert_eq!(focus.focused_tab(WindowId(1)), Some(last));
        for id in &chain[..chain.len() - 1] {
            prop_assert!(!focus.references(TabId(*id)));
        }
    }
}
