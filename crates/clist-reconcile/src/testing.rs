#![forbid(unsafe_code)]

//! Deterministic in-memory surface for tests.
//!
//! [`MockSurface`] stacks its slots vertically with no overlap: the frame of
//! a slot is the sum of the extents above it. This makes geometry assertions
//! exact. Detached slots keep their size so a later attach restores the same
//! visual instance, mirroring how a real view is moved within a hierarchy.
//!
//! The mock is part of the public API so downstream crates can test their
//! own pipelines against it.

use ahash::AHashMap;
use clist_core::ItemSize;

use crate::surface::{SlotHandle, SlotRect, Surface};

/// In-memory [`Surface`] driven entirely by the sizes it was given.
#[derive(Debug)]
pub struct MockSurface {
    /// On-screen handles in visual order.
    order: Vec<SlotHandle>,
    /// Sizes of every live slot, attached or detached.
    sizes: AHashMap<SlotHandle, ItemSize>,
    next_handle: u64,
    viewport_offset: f32,
    viewport_height: f32,
    /// Every handle ever highlighted, in call order.
    highlighted: Vec<SlotHandle>,
}

impl MockSurface {
    /// An empty surface with the given viewport height.
    #[must_use]
    pub fn new(viewport_height: f32) -> Self {
        Self {
            order: Vec::new(),
            sizes: AHashMap::new(),
            next_handle: 1,
            viewport_offset: 0.0,
            viewport_height,
            highlighted: Vec::new(),
        }
    }

    /// Number of slots currently on screen.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.order.len()
    }

    /// Handles passed to [`Surface::highlight_slot`], in call order.
    #[must_use]
    pub fn highlighted(&self) -> &[SlotHandle] {
        &self.highlighted
    }

    fn top_of(&self, index: usize) -> f32 {
        self.order[..index]
            .iter()
            .map(|handle| self.sizes.get(handle).copied().unwrap_or_default().extent())
            .sum()
    }
}

impl Surface for MockSurface {
    fn insert_slot(&mut self, position: usize, size: ItemSize) -> SlotHandle {
        let handle = SlotHandle::new(self.next_handle);
        self.next_handle += 1;
        self.order.insert(position.min(self.order.len()), handle);
        self.sizes.insert(handle, size);
        handle
    }

    fn remove_slot(&mut self, handle: SlotHandle) {
        self.order.retain(|&h| h != handle);
        self.sizes.remove(&handle);
    }

    fn detach_slot(&mut self, handle: SlotHandle) {
        // Size stays registered: the slot is off screen, not destroyed.
        self.order.retain(|&h| h != handle);
    }

    fn attach_slot(&mut self, position: usize, handle: SlotHandle) {
        debug_assert!(self.sizes.contains_key(&handle), "attach of unknown slot");
        self.order.insert(position.min(self.order.len()), handle);
    }

    fn clear_slots(&mut self) {
        self.order.clear();
        self.sizes.clear();
    }

    fn visible_slots(&self) -> Vec<SlotHandle> {
        self.order.clone()
    }

    fn slot_frame(&self, handle: SlotHandle) -> Option<SlotRect> {
        let index = self.order.iter().position(|&h| h == handle)?;
        let size = self.sizes.get(&handle)?;
        Some(SlotRect {
            y: self.top_of(index),
            height: size.height,
        })
    }

    fn viewport_offset(&self) -> f32 {
        self.viewport_offset
    }

    fn set_viewport_offset(&mut self, offset: f32) {
        self.viewport_offset = offset;
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn content_height(&self) -> f32 {
        self.top_of(self.order.len())
    }

    fn highlight_slot(&mut self, handle: SlotHandle) {
        self.highlighted.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_stack_vertically() {
        let mut surface = MockSurface::new(100.0);
        let a = surface.insert_slot(0, ItemSize::new(10.0).with_bottom_margin(2.0));
        let b = surface.insert_slot(1, ItemSize::new(20.0));

        assert_eq!(surface.slot_frame(a), Some(SlotRect { y: 0.0, height: 10.0 }));
        assert_eq!(surface.slot_frame(b), Some(SlotRect { y: 12.0, height: 20.0 }));
        assert_eq!(surface.content_height(), 32.0);
    }

    #[test]
    fn remove_destroys_but_detach_preserves() {
        let mut surface = MockSurface::new(100.0);
        let a = surface.insert_slot(0, ItemSize::new(10.0));
        let b = surface.insert_slot(1, ItemSize::new(20.0));

        surface.detach_slot(a);
        assert_eq!(surface.visible_slots(), [b]);
        surface.attach_slot(1, a);
        assert_eq!(surface.visible_slots(), [b, a]);
        assert_eq!(surface.slot_frame(a), Some(SlotRect { y: 20.0, height: 10.0 }));

        surface.remove_slot(b);
        assert_eq!(surface.visible_slots(), [a]);
        assert_eq!(surface.slot_frame(b), None);
    }

    #[test]
    fn insert_position_is_clamped() {
        let mut surface = MockSurface::new(100.0);
        let a = surface.insert_slot(9, ItemSize::new(10.0));
        assert_eq!(surface.visible_slots(), [a]);
    }

    #[test]
    fn highlights_are_recorded_in_order() {
        let mut surface = MockSurface::new(100.0);
        let a = surface.insert_slot(0, ItemSize::new(10.0));
        let b = surface.insert_slot(1, ItemSize::new(10.0));
        surface.highlight_slot(b);
        surface.highlight_slot(a);
        assert_eq!(surface.highlighted(), [b, a]);
    }
}
