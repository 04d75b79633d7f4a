//! Property tests for the inventory differ
//!
//! Run with: `cargo test -p inventory --test diff_properties`

use inventory::{DeviceIdentity, Inventory, diff};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy for a single identity from a small space, so sets overlap often
fn identity_strategy() -> impl Strategy<Value = DeviceIdentity> {
    (0u16..8, 0u16..8, 1u8..4, 1u8..16)
        .prop_map(|(vid, pid, bus, addr)| DeviceIdentity::new(vid, pid, bus, addr))
}

fn set_strategy() -> impl Strategy<Value = HashSet<DeviceIdentity>> {
    proptest::collection::hash_set(identity_strategy(), 0..24)
}

fn inventory(set: &HashSet<DeviceIdentity>) -> Inventory {
    set.iter().copied().collect()
}

proptest! {
    /// Property: no change between identical polls
    #[test]
    fn prop_diff_same_is_empty(s in set_strategy()) {
        let inv = inventory(&s);
        let change = diff(&inv, &inv);
        prop_assert!(change.arrived.is_empty());
        prop_assert!(change.departed.is_empty());
    }

    /// Property: everything arrives when starting from nothing
    #[test]
    fn prop_diff_from_empty(s in set_strategy()) {
        let change = diff(&Inventory::new(), &inventory(&s));
        prop_assert_eq!(change.arrived, s);
        prop_assert!(change.departed.is_empty());
    }

    /// Property: everything departs when going to nothing
    #[test]
    fn prop_diff_to_empty(s in set_strategy()) {
        let change = diff(&inventory(&s), &Inventory::new());
        prop_assert!(change.arrived.is_empty());
        prop_assert_eq!(change.departed, s);
    }

    /// Property: diff(S, (S - D) | A) == (A, D) for A disjoint from S and D within S
    #[test]
    fn prop_diff_recovers_arrivals_and_departures(
        base in set_strategy(),
        candidates in set_strategy(),
        keep_mask in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let arrived: HashSet<_> = candidates.difference(&base).copied().collect();
        let departed: HashSet<_> = base
            .iter()
            .enumerate()
            .filter(|(i, _)| !keep_mask[*i])
            .map(|(_, id)| *id)
            .collect();

        let current: HashSet<_> = base
            .difference(&departed)
            .copied()
            .chain(arrived.iter().copied())
            .collect();

        let change = diff(&inventory(&base), &inventory(&current));
        prop_assert_eq!(change.arrived, arrived);
        prop_assert_eq!(change.departed, departed);
    }

    /// Property: arrivals and departures never overlap
    #[test]
    fn prop_diff_disjoint(previous in set_strategy(), current in set_strategy()) {
        let change = diff(&inventory(&previous), &inventory(&current));
        prop_assert!(change.arrived.is_disjoint(&change.departed));
        prop_assert!(change.arrived.iter().all(|id| current.contains(id) && !previous.contains(id)));
        prop_assert!(change.departed.iter().all(|id| previous.contains(id) && !current.contains(id)));
    }

    /// Property: diff is deterministic
    #[test]
    fn prop_diff_deterministic(previous in set_strategy(), current in set_strategy()) {
        let a = diff(&inventory(&previous), &inventory(&current));
        let b = diff(&inventory(&previous), &inventory(&current));
        prop_assert_eq!(a, b);
    }
}
