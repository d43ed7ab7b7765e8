#![forbid(unsafe_code)]

//! Layout models: per-item sizes tagged with the width they were computed
//! for.

use clist_core::ItemSize;

/// Ordered per-item sizes for one snapshot at one viewport width.
///
/// A model computed for width `w1` is invalid once the surface's width
/// changes to `w2 != w1`; [`LayoutModel::is_valid_for`] is the staleness
/// check the reconciler runs before applying.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutModel {
    sizes: Vec<ItemSize>,
    width: f32,
}

impl LayoutModel {
    /// Assemble a model from already-merged sizes.
    #[must_use]
    pub fn new(sizes: Vec<ItemSize>, width: f32) -> Self {
        Self { sizes, width }
    }

    /// The width the sizes were computed for.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Number of items covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Whether the model covers no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// The size of the item at `position`.
    #[must_use]
    pub fn size_at(&self, position: usize) -> Option<ItemSize> {
        self.sizes.get(position).copied()
    }

    /// Whether the model is still usable at `width`.
    #[must_use]
    pub fn is_valid_for(&self, width: f32) -> bool {
        self.width == width
    }

    /// Vertical offset of the item at `position` from the top of the
    /// content (sum of the extents above it).
    #[must_use]
    pub fn offset_of(&self, position: usize) -> f32 {
        self.sizes
            .iter()
            .take(position)
            .map(ItemSize::extent)
            .sum()
    }

    /// Total content height (sizes plus bottom margins).
    #[must_use]
    pub fn total_height(&self) -> f32 {
        self.sizes.iter().map(ItemSize::extent).sum()
    }
}
