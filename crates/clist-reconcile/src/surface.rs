#![forbid(unsafe_code)]

//! The narrow interface to the platform view.
//!
//! The engine never renders anything itself. It drives a [`Surface`] through
//! slot-granular structural operations and reads back geometry for the
//! scroll-anchor policy. Slots are addressed by [`SlotHandle`], a stable
//! identifier minted by the surface at insertion, so reattaching a moved
//! slot needs no positional bookkeeping on the surface side.
//!
//! Structural operations come in two removal flavors: [`Surface::remove_slot`]
//! destroys a slot for good, while [`Surface::detach_slot`] takes it off
//! screen but keeps it reusable so a later [`Surface::attach_slot`] can place
//! the same visual instance at its new position. The reconciler expresses a
//! move as detach followed by attach.

use std::fmt;

use clist_core::ItemSize;

/// Stable identifier of one visual slot, minted by the surface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotHandle(u64);

impl SlotHandle {
    /// Construct a handle from its raw value. Surfaces mint handles; the
    /// engine only carries them around.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotHandle({})", self.0)
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Vertical extent of a slot in content coordinates. The engine only anchors
/// vertically, so horizontal geometry never crosses this interface.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SlotRect {
    /// Distance from the top of the content to the slot's top edge.
    pub y: f32,
    /// Height of the slot's content (excluding the bottom margin).
    pub height: f32,
}

impl SlotRect {
    /// The slot's bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Structural and geometric operations the reconciler needs from the
/// platform view.
///
/// All methods are called exclusively on the affinity thread.
pub trait Surface {
    /// Create a new slot of `size` at `position` and return its handle.
    fn insert_slot(&mut self, position: usize, size: ItemSize) -> SlotHandle;

    /// Destroy the slot identified by `handle`. Unknown handles are a no-op.
    fn remove_slot(&mut self, handle: SlotHandle);

    /// Take the slot off screen, keeping its visual instance reusable for a
    /// later [`Surface::attach_slot`].
    fn detach_slot(&mut self, handle: SlotHandle);

    /// Re-insert a previously detached slot at `position`.
    fn attach_slot(&mut self, position: usize, handle: SlotHandle);

    /// Destroy every slot.
    fn clear_slots(&mut self);

    /// The handles currently on screen, in visual order. This is the
    /// surface's own account of its state, read by the pre-apply consistency
    /// check; it must reflect reality, not the engine's bookkeeping.
    fn visible_slots(&self) -> Vec<SlotHandle>;

    /// The slot's rectangle in content coordinates, if it is on screen.
    fn slot_frame(&self, handle: SlotHandle) -> Option<SlotRect>;

    /// Current scroll offset from the top of the content.
    fn viewport_offset(&self) -> f32;

    /// Set the scroll offset.
    fn set_viewport_offset(&mut self, offset: f32);

    /// Height of the visible viewport.
    fn viewport_height(&self) -> f32;

    /// Total height of the content.
    fn content_height(&self) -> f32;

    /// Play the platform's highlight treatment on a slot (used by
    /// scroll-to-item).
    fn highlight_slot(&mut self, handle: SlotHandle);
}
