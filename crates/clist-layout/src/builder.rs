#![forbid(unsafe_code)]

//! The hybrid layout builder.
//!
//! Building a model for a snapshot partitions the items by their size
//! query's capability flag:
//!
//! - **concurrency-safe** queries run on scoped worker threads, index-strided
//!   so every worker touches a similar mix of items;
//! - **affinity-only** queries are collected into one batch job that hops to
//!   the affinity executor and blocks the builder until the batch returns.
//!
//! Results are merged positionally into a single ordered size array tagged
//! with the width, so the output is indistinguishable from a sequential
//! measurement pass.
//!
//! `build` suspends its caller until both halves are done. When the builder
//! itself already runs on the affinity thread (the synchronous first-load
//! path), the affinity batch runs inline rather than round-tripping.

use std::sync::mpsc;
use std::thread;

use clist_core::{ItemCollection, ItemSize, QueryCapability, SizeQuery};
use clist_queue::SerialHandle;
use tracing::trace;

use crate::model::LayoutModel;

/// Upper bound on scoped workers. Sizing text bubbles is cheap per item;
/// past a handful of threads the spawn cost dominates.
const MAX_WORKERS: usize = 4;

/// State of the affinity-only measurement batch while the concurrent half
/// runs.
enum AffinityBatch {
    Done(Vec<(usize, ItemSize)>),
    Pending(mpsc::Receiver<Vec<(usize, ItemSize)>>),
}

/// Split item positions by size-query capability, preserving original
/// indices.
///
/// Exposed separately from [`LayoutModelBuilder::build`] so the partitioning
/// step can be tested without thread machinery.
#[must_use]
pub fn partition_by_capability(items: &ItemCollection) -> (Vec<usize>, Vec<usize>) {
    let mut concurrency_safe = Vec::new();
    let mut affinity_only = Vec::new();
    for (position, item) in items.iter().enumerate() {
        match item.size_query().capability() {
            QueryCapability::ConcurrencySafe => concurrency_safe.push(position),
            QueryCapability::AffinityOnly => affinity_only.push(position),
        }
    }
    (concurrency_safe, affinity_only)
}

/// Builds [`LayoutModel`]s with the hybrid concurrent/affinity strategy.
#[derive(Clone, Copy, Debug)]
pub struct LayoutModelBuilder {
    workers: usize,
}

impl LayoutModelBuilder {
    /// A builder using up to [`MAX_WORKERS`] scoped workers (bounded by the
    /// machine's available parallelism).
    #[must_use]
    pub fn new() -> Self {
        let workers = thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(1)
            .min(MAX_WORKERS);
        Self { workers }
    }

    /// A builder with an explicit worker bound (minimum 1).
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Compute the layout model for `items` at `width`.
    ///
    /// Suspends the caller until every size is known. Affinity-only queries
    /// run on `affinity`'s thread; everything else runs on scoped workers
    /// (or inline when only one worker is configured or the batch is tiny).
    #[must_use]
    pub fn build(
        &self,
        items: &ItemCollection,
        width: f32,
        affinity: &SerialHandle,
    ) -> LayoutModel {
        let (concurrency_safe, affinity_only) = partition_by_capability(items);
        trace!(
            total = items.len(),
            concurrent = concurrency_safe.len(),
            affinity = affinity_only.len(),
            width,
            "building layout model"
        );

        let mut sizes = vec![ItemSize::default(); items.len()];

        // Kick the affinity batch off first so it overlaps the concurrent
        // work below. The queries are cloned out of the snapshot because the
        // job must be 'static to cross onto the affinity thread.
        let affinity_batch: Vec<(usize, SizeQuery)> = affinity_only
            .iter()
            .map(|&position| {
                let item = items
                    .get(position)
                    .expect("partition positions come from the same snapshot");
                (position, item.size_query().clone())
            })
            .collect();
        let measure_batch = move || {
            affinity_batch
                .into_iter()
                .map(|(position, query)| (position, query.measure(width)))
                .collect::<Vec<_>>()
        };
        let pending = if affinity_only.is_empty() {
            AffinityBatch::Done(Vec::new())
        } else if affinity.is_current() {
            // Synchronous first-load path: we already are the affinity
            // thread, so a round-trip would deadlock the executor.
            AffinityBatch::Done(measure_batch())
        } else {
            let (tx, rx) = mpsc::channel();
            affinity.dispatch(move || {
                let _ = tx.send(measure_batch());
            });
            AffinityBatch::Pending(rx)
        };

        for (position, size) in self.measure_concurrent(items, &concurrency_safe, width) {
            sizes[position] = size;
        }
        let measured = match pending {
            AffinityBatch::Done(measured) => measured,
            AffinityBatch::Pending(rx) => rx
                .recv()
                .expect("affinity executor dropped while a layout batch was pending"),
        };
        for (position, size) in measured {
            sizes[position] = size;
        }

        LayoutModel::new(sizes, width)
    }

    /// Measure the concurrency-safe positions, striding them across scoped
    /// workers.
    fn measure_concurrent(
        &self,
        items: &ItemCollection,
        positions: &[usize],
        width: f32,
    ) -> Vec<(usize, ItemSize)> {
        let workers = self.workers.min(positions.len());
        if workers <= 1 {
            return positions
                .iter()
                .map(|&position| {
                    let item = items
                        .get(position)
                        .expect("partition positions come from the same snapshot");
                    (position, item.size_query().measure(width))
                })
                .collect();
        }

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || {
                        positions
                            .iter()
                            .skip(worker)
                            .step_by(workers)
                            .map(|&position| {
                                let item = items
                                    .get(position)
                                    .expect("partition positions come from the same snapshot");
                                (position, item.size_query().measure(width))
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .expect("size queries are infallible; a panic here is a query bug")
                })
                .collect()
        })
    }
}

impl Default for LayoutModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
