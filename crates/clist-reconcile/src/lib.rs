#![forbid(unsafe_code)]

//! The reconciliation engine: applies successive item snapshots to a visual
//! surface.
//!
//! [`Reconciler`] ties the engine together: it takes snapshots from the data
//! source, obtains the diff and layout model off the affinity thread, runs
//! each cycle through the single-flight update queue, validates state
//! consistency, applies either an incremental patch or a full rebuild to the
//! [`Surface`], and preserves the user's scroll anchor across the mutation.
//!
//! The surface abstraction is deliberately narrow: an opaque [`SlotHandle`]
//! per rendered item plus vertical geometry. Rendering, styling and gestures
//! live entirely on the other side of the [`Surface`] trait.
//!
//! [`testing::MockSurface`] is a deterministic in-memory surface for driving
//! the engine in tests.

pub mod reconciler;
pub mod slot_map;
pub mod surface;
pub mod testing;

pub use reconciler::{AppliedUpdate, ApplyMode, Reconciler};
pub use slot_map::VisibleSlotMap;
pub use surface::{SlotHandle, SlotRect, Surface};
