#![forbid(unsafe_code)]

//! Incremental chat-list reconciliation engine.
//!
//! `clist` keeps an on-screen ordered list synchronized with
//! asynchronously-produced data snapshots: an identity-based differ, a
//! hybrid concurrent/affinity layout builder, a single-flight FIFO update
//! queue, and a reconciler that validates state, patches or rebuilds the
//! visual surface, and preserves the user's scroll anchor.
//!
//! This crate is a facade: the engine lives in the member crates, re-exported
//! here under their concern names.
//!
//! ```
//! use clist::prelude::*;
//! use clist::reconcile::testing::MockSurface;
//!
//! let affinity = SerialExecutor::new("ui");
//! let list = Reconciler::new(MockSurface::new(480.0), affinity.handle(), 320.0);
//!
//! let snapshot = ItemCollection::new(vec![ListItem::new(
//!     "msg-1",
//!     ItemKind("message"),
//!     SizeQuery::concurrency_safe(|_| ItemSize::new(40.0)),
//! )])
//! .unwrap();
//! list.submit(snapshot, UpdateClass::FirstLoad);
//! ```

pub use clist_core as core;
pub use clist_layout as layout;
pub use clist_queue as queue;
pub use clist_reconcile as reconcile;

/// The types most integrations need.
pub mod prelude {
    pub use clist_core::{
        ChangeSet, ItemCollection, ItemKey, ItemKind, ItemSize, ListItem, QueryCapability,
        SizeQuery, SnapshotError, UpdateClass, diff,
    };
    pub use clist_layout::{LayoutModel, LayoutModelBuilder};
    pub use clist_queue::{Completion, ListenerId, SerialExecutor, SerialHandle, UpdateQueue};
    pub use clist_reconcile::{
        AppliedUpdate, ApplyMode, Reconciler, SlotHandle, SlotRect, Surface, VisibleSlotMap,
    };
}
