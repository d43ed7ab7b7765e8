#![forbid(unsafe_code)]

//! The position-to-handle map.
//!
//! [`VisibleSlotMap`] is the single source of truth for what the engine
//! believes is rendered: position `p` of the currently applied snapshot maps
//! to the handle occupying that position. It persists across reconciliation
//! cycles and is mutated only by the apply step, always on the affinity
//! thread.
//!
//! The surface keeps its own account of its slots; the two are compared
//! before every incremental patch. Disagreement means something outside the
//! engine (an unfinished animation, an out-of-band mutation) has touched the
//! surface, and the cycle degrades to a full rebuild.

use clist_core::ChangeSet;

use crate::surface::SlotHandle;

/// Ordered `position → SlotHandle` map for the applied snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleSlotMap {
    slots: Vec<SlotHandle>,
}

impl VisibleSlotMap {
    /// An empty map (nothing rendered yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from handles already in position order.
    #[must_use]
    pub fn from_handles(slots: Vec<SlotHandle>) -> Self {
        Self { slots }
    }

    /// Number of rendered positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The handle at `position`, if rendered.
    #[must_use]
    pub fn handle_at(&self, position: usize) -> Option<SlotHandle> {
        self.slots.get(position).copied()
    }

    /// The position currently held by `handle`.
    #[must_use]
    pub fn position_of(&self, handle: SlotHandle) -> Option<usize> {
        self.slots.iter().position(|&h| h == handle)
    }

    /// The handles in position order.
    #[must_use]
    pub fn handles(&self) -> &[SlotHandle] {
        &self.slots
    }

    /// Replay `changeset` against this map.
    ///
    /// Survivors land at their new positions; inserted positions come back
    /// as `None` for the apply step to fill with freshly minted handles.
    /// Returns `None` when the changeset does not transform this map cleanly,
    /// which the reconciler treats as "rebuild instead of patching".
    #[must_use]
    pub fn replay(&self, changeset: &ChangeSet) -> Option<Vec<Option<SlotHandle>>> {
        changeset.replay(&self.slots)
    }
}
