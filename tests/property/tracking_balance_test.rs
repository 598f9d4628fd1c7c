//! Property-based tests for the tracking-exclusion state machine.
//!
//! These tests verify that tracking suppression behaves as a per-tab counted
//! hold: a tab reads as tracking exactly while it has unreleased holds, and
//! a dropped guard always returns its tabs to the normal state, for
//! arbitrary interleavings of holds and releases.

use proptest::prelude::*;
use tab_groups::managers::tab_tracker::{TabTracker, TabTrackState};
use tab_groups::types::tab::TabId;

const TAB_POOL: u32 = 5;

#[derive(Debug, Clone)]
enum HoldOp {
    Begin(u32),
    End(u32),
}

/// Strategy for generating interleaved hold/release sequences over a small
/// pool of tab ids, including unbalanced releases.
fn arb_hold_ops() -> impl Strategy<Value = Vec<HoldOp>> {
    prop::collection::vec(
        prop_oneof![
            (0..TAB_POOL).prop_map(HoldOp::Begin),
            (0..TAB_POOL).prop_map(HoldOp::End),
        ],
        0..48,
    )
}

// For any sequence of hold/release operations, a tab reads as tracking
// exactly while its hold counter is positive; releases without a matching
// hold are ignored rather than driving the counter negative.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tracking_state_matches_hold_counter(ops in arb_hold_ops()) {
        let tracker = TabTracker::new();
        let mut holds = [0u32; TAB_POOL as usize];

        for op in &ops {
            match op {
                HoldOp::Begin(id) => {
                    tracker.begin_tracking(TabId(*id));
                    holds[*id as usize] += 1;
                }
                HoldOp::End(id) => {
                    tracker.end_tracking(TabId(*id));
                    holds[*id as usize] = holds[*id as usize].saturating_sub(1);
                }
            }

            for id in 0..TAB_POOL {
                prop_assert_eq!(
                    tracker.is_tracking(TabId(id)),
                    holds[id as usize] > 0,
                    "tab {} should be tracking iff it has holds ({})",
                    id,
                    holds[id as usize]
                );
            }
        }
    }

    // A dropped guard releases every hold it took, including duplicates for
    // the same tab, leaving every tab in the pool back at normal.
    #[test]
    fn guard_drop_returns_every_tab_to_normal(
        first in prop::collection::vec(0..TAB_POOL, 1..16),
        second in prop::collection::vec(0..TAB_POOL, 0..16),
    ) {
        let tracker = TabTracker::new();

        {
            let mut guard = tracker.suppress(first.iter().map(|id| TabId(*id)));
            guard.extend(second.iter().map(|id| TabId(*id)));

            for id in first.iter().chain(second.iter()) {
                prop_assert!(tracker.is_tracking(TabId(*id)));
            }
        }

        for id in 0..TAB_POOL {
            prop_assert_eq!(
                tracker.state(TabId(id)),
                TabTrackState::Normal,
                "tab {} should be normal after the guard dropped",
                id
            );
        }
    }

    // Releasing a tab early from the guard is equivalent to the guard
    // dropping for that tab; the remaining holds survive until drop.
    #[test]
    fn early_release_only_affects_the_released_tab(
        ids in prop::collection::vec(0..TAB_POOL, 2..16),
        release_index in 0usize..16,
    ) {
        let tracker = TabTracker::new();
        let released = ids[release_index % ids.len()];

        let mut guard = tracker.suppress(ids.iter().map(|id| TabId(*id)));
        guard.release(TabId(released));

        prop_assert!(!tracker.is_tracking(TabId(released)));
        for id in &ids {
            if *id != released {
                prop_assert!(
                    tracker.is_tracking(TabId(*id)),
                    "tab {} should still be tracking after releasing {}",
                    id,
                    released
                );
            }
        }

        drop(guard);
        for id in 0..TAB_POOL {
            prop_assert_eq!(tracker.state(TabId(id)), TabTrackState::Normal);
        }
    }
}
