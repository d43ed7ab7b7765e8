#![forbid(unsafe_code)]

//! The positional differ.
//!
//! [`diff`] computes a [`ChangeSet`] between two snapshots in O(n) time and
//! space using the snapshots' `key → position` maps. It is a *positional*
//! diff, not a minimal-edit (LCS) diff: a full reorder reports one `moved`
//! entry per displaced item rather than a minimal move set. That trade-off
//! buys O(n) determinism, and downstream animation classification depends on
//! it.
//!
//! # Semantics callers must not "fix"
//!
//! An item whose key appears in both snapshots at different positions is
//! always classified as *moved*, even when it conceptually was "deleted,
//! and an unrelated item with a reused key inserted elsewhere". Changing
//! this would alter whether such an item animates as a move or as a
//! delete+insert on the surface.
//!
//! # Properties
//!
//! - `diff(a, a)` is empty.
//! - Replaying `diff(a, b)` against `a`'s position map yields `b`'s position
//!   map (checked by the proptest below and relied on by the reconciler).

use crate::changeset::ChangeSet;
use crate::snapshot::ItemCollection;

/// Compute the changeset transforming `old` into `new`.
///
/// Pure; both snapshots' prebuilt indices are used, so no allocation beyond
/// the output occurs for the lookups.
#[must_use]
pub fn diff(old: &ItemCollection, new: &ItemCollection) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (position, item) in old.iter().enumerate() {
        if !new.contains(item.key()) {
            changes.deleted.push(position);
        }
    }

    for (position, item) in new.iter().enumerate() {
        match old.index_of(item.key()) {
            None => changes.inserted.push(position),
            Some(old_position) if old_position != position => {
                changes.moved.push((old_position, position));
            }
            Some(_) => {}
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemKind, ItemSize, ListItem, SizeQuery};
    use proptest::prelude::*;

    fn snapshot(keys: &[&str]) -> ItemCollection {
        ItemCollection::new(
            keys.iter()
                .map(|key| {
                    ListItem::new(
                        *key,
                        ItemKind("message"),
                        SizeQuery::concurrency_safe(|_| ItemSize::new(20.0)),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let a = snapshot(&["a", "b", "c"]);
        let changes = diff(&a, &a);
        assert!(changes.is_empty());
    }

    #[test]
    fn scenario_a_reorder() {
        // old = [A, B, C], new = [A, C, B].
        let changes = diff(&snapshot(&["A", "B", "C"]), &snapshot(&["A", "C", "B"]));
        assert!(changes.inserted.is_empty());
        assert!(changes.deleted.is_empty());
        assert_eq!(changes.moved.as_slice(), &[(2, 1), (1, 2)]);
    }

    #[test]
    fn scenario_b_pure_insert() {
        let changes = diff(&snapshot(&[]), &snapshot(&["X"]));
        assert_eq!(changes.inserted, vec![0]);
        assert!(changes.deleted.is_empty());
        assert!(changes.moved.is_empty());
    }

    #[test]
    fn scenario_c_delete_with_shift() {
        // old = [X, Y], new = [Y]: X deleted at 0, Y shifts 1 -> 0.
        let changes = diff(&snapshot(&["X", "Y"]), &snapshot(&["Y"]));
        assert_eq!(changes.deleted, vec![0]);
        assert!(changes.inserted.is_empty());
        assert_eq!(changes.moved.as_slice(), &[(1, 0)]);
    }

    #[test]
    fn append_only_reports_inserts() {
        let changes = diff(&snapshot(&["a", "b"]), &snapshot(&["a", "b", "c", "d"]));
        assert_eq!(changes.inserted, vec![2, 3]);
        assert!(changes.deleted.is_empty());
        assert!(changes.moved.is_empty());
    }

    #[test]
    fn prepend_shifts_every_survivor() {
        let changes = diff(&snapshot(&["a", "b"]), &snapshot(&["p", "a", "b"]));
        assert_eq!(changes.inserted, vec![0]);
        assert!(changes.deleted.is_empty());
        assert_eq!(changes.moved.as_slice(), &[(0, 1), (1, 2)]);
    }

    #[test]
    fn disjoint_snapshots_delete_and_insert_everything() {
        let changes = diff(&snapshot(&["a", "b"]), &snapshot(&["x", "y", "z"]));
        assert_eq!(changes.deleted, vec![0, 1]);
        assert_eq!(changes.inserted, vec![0, 1, 2]);
        assert!(changes.moved.is_empty());
    }

    #[test]
    fn reused_key_at_new_position_is_moved_not_replaced() {
        // Even if "b" at position 0 is conceptually a different item that
        // reused the key, the positional differ reports a move.
        let changes = diff(&snapshot(&["a", "b"]), &snapshot(&["b", "c"]));
        assert_eq!(changes.deleted, vec![0]);
        assert_eq!(changes.inserted, vec![1]);
        assert_eq!(changes.moved.as_slice(), &[(1, 0)]);
    }

    #[test]
    fn full_reorder_reports_one_move_per_displaced_item() {
        let changes = diff(
            &snapshot(&["a", "b", "c", "d"]),
            &snapshot(&["d", "c", "b", "a"]),
        );
        assert_eq!(changes.moved.len(), 4);
    }

    #[test]
    fn diff_replay_round_trip_simple() {
        let old = snapshot(&["a", "b", "c", "d"]);
        let new = snapshot(&["n", "d", "a", "c"]);
        let changes = diff(&old, &new);
        let replayed = changes.replay(&old.keys()).unwrap();
        for (position, slot) in replayed.iter().enumerate() {
            match slot {
                Some(key) => assert_eq!(key, new.get(position).unwrap().key()),
                None => assert!(changes.inserted.contains(&position)),
            }
        }
    }

    // ------------------------------------------------------------------
    // Property: replaying diff(old, new) against old's position map yields
    // exactly new's position map, for arbitrary unique-key snapshots.
    // ------------------------------------------------------------------

    fn key_pool() -> Vec<String> {
        (0..12).map(|i| format!("k{i}")).collect()
    }

    fn arb_key_list() -> impl Strategy<Value = Vec<String>> {
        proptest::sample::subsequence(key_pool(), 0..=12).prop_shuffle()
    }

    proptest! {
        #[test]
        fn prop_diff_replay_round_trip(old_keys in arb_key_list(), new_keys in arb_key_list()) {
            let old_refs: Vec<&str> = old_keys.iter().map(String::as_str).collect();
            let new_refs: Vec<&str> = new_keys.iter().map(String::as_str).collect();
            let old = snapshot(&old_refs);
            let new = snapshot(&new_refs);

            let changes = diff(&old, &new);
            let replayed = changes.replay(&old.keys())
                .expect("diff output must replay cleanly against its own old snapshot");

            prop_assert_eq!(replayed.len(), new.len());
            for (position, slot) in replayed.iter().enumerate() {
                match slot {
                    Some(key) => prop_assert_eq!(key, new.get(position).unwrap().key()),
                    None => prop_assert!(changes.inserted.contains(&position)),
                }
            }
        }

        #[test]
        fn prop_diff_with_self_is_empty(keys in arb_key_list()) {
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let snap = snapshot(&refs);
            prop_assert!(diff(&snap, &snap).is_empty());
        }
    }
}
