#![forbid(unsafe_code)]

//! Per-item layout computation for the clist reconciliation engine.
//!
//! A [`LayoutModel`] is the ordered list of item sizes for one snapshot at
//! one viewport width. Models are derived, transient values: the reconciler
//! discards and rebuilds them whenever the snapshot or the width goes stale.
//!
//! [`LayoutModelBuilder`] produces models with a hybrid execution strategy:
//! concurrency-safe size queries fan out across scoped worker threads, while
//! affinity-only queries are batched into a single hop onto the affinity
//! executor. This keeps the common case maximally parallel without ever
//! violating the affinity requirement of the minority case.

pub mod builder;
pub mod model;

pub use builder::{LayoutModelBuilder, partition_by_capability};
pub use model::LayoutModel;
