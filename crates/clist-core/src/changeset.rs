#![forbid(unsafe_code)]

//! Changesets: the insert/delete/move description between two snapshots.
//!
//! A [`ChangeSet`] is a complete transformation recipe: replaying it against
//! a position map consistent with the old snapshot must produce a map
//! consistent with the new one. The reconciler leans on this property for
//! its pre-apply consistency check, so [`ChangeSet::replay`] validates the
//! changeset against the map it is given and reports ill-formed input
//! instead of producing a silently wrong result.
//!
//! # Invariants
//!
//! 1. `inserted` and `deleted` are sorted ascending and duplicate-free.
//! 2. `inserted` positions are in new-snapshot space; `deleted` positions in
//!    old-snapshot space; `moved` pairs are `(old, new)`.
//! 3. A position never appears both as a move source and in `deleted`, nor
//!    both as a move target and in `inserted`.
//!
//! The differ upholds these by construction; `replay` re-checks them
//! defensively because the reconciler treats replay failure as its signal to
//! fall back to a full rebuild.

use smallvec::SmallVec;

/// Inline capacity for the `moved` list. Most chat updates displace only the
/// tail of the list (send, receive, edit-in-place), so short move lists
/// dominate.
const MOVED_INLINE: usize = 8;

/// A complete description transforming one snapshot into the next.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// New-snapshot positions holding items absent from the old snapshot.
    /// Sorted ascending.
    pub inserted: Vec<usize>,
    /// Old-snapshot positions of items absent from the new snapshot.
    /// Sorted ascending.
    pub deleted: Vec<usize>,
    /// `(old position, new position)` pairs for items present in both
    /// snapshots at different positions. Ordered by new-snapshot traversal.
    pub moved: SmallVec<[(usize, usize); MOVED_INLINE]>,
}

impl ChangeSet {
    /// Whether the changeset describes no structural change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty() && self.moved.is_empty()
    }

    /// Total number of recorded operations.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.moved.len()
    }

    /// Length of the new snapshot implied by replaying against an old map of
    /// `old_len` entries.
    #[must_use]
    pub fn new_len(&self, old_len: usize) -> usize {
        old_len - self.deleted.len() + self.inserted.len()
    }

    /// Replay the changeset against a position map consistent with the old
    /// snapshot.
    ///
    /// Returns the new position map: surviving values land at their new
    /// positions; inserted positions are `None` (their values do not exist
    /// until the apply step creates them).
    ///
    /// Returns `None` when the changeset is ill-formed against `old`:
    /// out-of-bounds sources or targets, colliding targets, a source that is
    /// both deleted and moved, an inserted position that is also a move
    /// target, or positions left uncovered. Callers treat this as "do not
    /// attempt an incremental patch".
    #[must_use]
    pub fn replay<T: Clone>(&self, old: &[T]) -> Option<Vec<Option<T>>> {
        let old_len = old.len();
        if self.deleted.len() > old_len {
            return None;
        }
        let new_len = self.new_len(old_len);

        // Mark deletions and move sources in old space.
        let mut consumed = vec![false; old_len];
        for &position in &self.deleted {
            if position >= old_len || consumed[position] {
                return None;
            }
            consumed[position] = true;
        }

        let mut new_map: Vec<Option<T>> = vec![None; new_len];
        let mut occupied = vec![false; new_len];

        for &(source, target) in &self.moved {
            if source >= old_len || target >= new_len {
                return None;
            }
            if consumed[source] || occupied[target] {
                return None;
            }
            consumed[source] = true;
            occupied[target] = true;
            new_map[target] = Some(old[source].clone());
        }

        // Untouched survivors keep their position: the differ records every
        // surviving item whose position changed as moved, so anything left
        // must land at its old index.
        for (position, value) in old.iter().enumerate() {
            if consumed[position] {
                continue;
            }
            if position >= new_len || occupied[position] {
                return None;
            }
            occupied[position] = true;
            new_map[position] = Some(value.clone());
        }

        // Inserted positions must be exactly the gaps that remain.
        for &position in &self.inserted {
            if position >= new_len || occupied[position] {
                return None;
            }
            occupied[position] = true;
        }
        if occupied.iter().any(|filled| !filled) {
            return None;
        }

        Some(new_map)
    }
}
