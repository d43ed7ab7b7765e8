#![forbid(unsafe_code)]

//! The reconciler: orchestrates every update cycle from snapshot submission
//! to surface mutation.
//!
//! Cycle pipeline per submitted snapshot:
//!
//! ```text
//! submit ── compute stage ──────── update queue ──── affinity thread
//!           diff + layout model    FIFO, single-    validate, apply,
//!           (off affinity)         flight           anchor, notify
//! ```
//!
//! The very first snapshot skips the pipeline and is applied synchronously
//! on the affinity thread before `submit` returns, so the surface never
//! shows an initial empty-content flash. Every later snapshot flows through
//! the in-order compute stage and the single-flight queue, which together
//! guarantee that cycles apply in exact submission order and are never
//! merged.
//!
//! # Incremental vs. rebuild
//!
//! A cycle applies incrementally only when all of the following hold:
//!
//! 1. the update class does not force a rebuild,
//! 2. the layout model and the sizes already applied to the surface are
//!    both valid for the current width,
//! 3. the surface's own account of its slots matches the last applied
//!    [`VisibleSlotMap`] exactly,
//! 4. the changeset replays cleanly against that map.
//!
//! Any failure degrades to a full rebuild. A wrong incremental patch is
//! never applied silently; the consistency check (3) is the main defense
//! against races with in-flight animations and out-of-band surface
//! mutation.
//!
//! # Scroll anchor
//!
//! Before mutating, the first moved entry (if any) becomes the reference
//! item and its rectangle is recorded; afterwards the viewport is translated
//! by the delta between the reference's post- and pre-update origins. With
//! no reference, a viewport previously pinned to the logical end stays
//! pinned; otherwise the offset is left untouched.

use std::sync::{Arc, Mutex};

use arc_swap::{ArcSwap, ArcSwapOption};
use clist_core::{ChangeSet, ItemCollection, ItemKey, UpdateClass, diff};
use clist_layout::{LayoutModel, LayoutModelBuilder};
use clist_queue::{ListenerId, Listeners, SerialExecutor, SerialHandle, UpdateQueue};
use tracing::{debug, info, warn};
use web_time::Instant;

use crate::slot_map::VisibleSlotMap;
use crate::surface::{SlotHandle, SlotRect, Surface};

/// Slack when deciding whether the viewport is pinned to the content's end;
/// absorbs accumulated float error in stacked extents.
const END_SLACK: f32 = 0.5;

/// How a cycle was applied to the surface.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApplyMode {
    /// The changeset was patched in, reusing handles for untouched
    /// positions.
    Incremental,
    /// Every handle was discarded and the surface rebuilt from the new
    /// snapshot.
    Rebuild,
}

/// Notification payload emitted after a cycle has been fully applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AppliedUpdate {
    /// The classification the snapshot was submitted with.
    pub class: UpdateClass,
    /// Which path the cycle took.
    pub mode: ApplyMode,
    /// Item count of the applied snapshot.
    pub item_count: usize,
}

struct PendingReveal {
    key: ItemKey,
    requested_at: Instant,
}

/// Affinity-thread state: the surface, the engine's slot bookkeeping and the
/// currently applied snapshot.
struct Core<S> {
    surface: S,
    slot_map: VisibleSlotMap,
    current: ItemCollection,
    /// Width the on-surface slots were sized for. A differing current width
    /// means every applied size is stale, not just the in-pipeline model.
    applied_width: f32,
    pending_reveal: Option<PendingReveal>,
}

/// Top-level orchestrator over a [`Surface`].
pub struct Reconciler<S: Surface + Send + 'static> {
    core: Arc<Mutex<Core<S>>>,
    listeners: Arc<Listeners<AppliedUpdate>>,
    /// Most recently submitted snapshot; the diff baseline for the next
    /// submission. `None` until the first snapshot arrives.
    latest: ArcSwapOption<ItemCollection>,
    /// Current viewport width, readable from compute workers.
    width: Arc<ArcSwap<f32>>,
    builder: LayoutModelBuilder,
    queue: Arc<UpdateQueue>,
    /// In-order compute stage. Owned last-but-one so pending compute jobs
    /// drain before the affinity handle goes away.
    compute: SerialExecutor,
    affinity: SerialHandle,
}

impl<S: Surface + Send + 'static> Reconciler<S> {
    /// Wrap `surface`, mutating it exclusively on `affinity`'s thread.
    ///
    /// `width` is the initial viewport width layout models are computed for.
    #[must_use]
    pub fn new(surface: S, affinity: SerialHandle, width: f32) -> Self {
        Self {
            core: Arc::new(Mutex::new(Core {
                surface,
                slot_map: VisibleSlotMap::new(),
                current: ItemCollection::empty(),
                applied_width: width,
                pending_reveal: None,
            })),
            listeners: Arc::new(Listeners::new()),
            latest: ArcSwapOption::from(None),
            width: Arc::new(ArcSwap::from_pointee(width)),
            builder: LayoutModelBuilder::new(),
            queue: Arc::new(UpdateQueue::new()),
            compute: SerialExecutor::new("clist-compute"),
            affinity,
        }
    }

    /// Submit a snapshot for reconciliation.
    ///
    /// The first snapshot is applied synchronously on the affinity thread
    /// before this returns. Later snapshots are processed asynchronously;
    /// cycles apply in submission order. Submissions are never coalesced,
    /// so a caller producing snapshots faster than cycles complete must
    /// coalesce upstream.
    pub fn submit(&self, snapshot: ItemCollection, class: UpdateClass) {
        let width = **self.width.load();
        let previous = self.latest.swap(Some(Arc::new(snapshot.clone())));

        let core = Arc::clone(&self.core);
        let listeners = Arc::clone(&self.listeners);
        let builder = self.builder;
        let affinity = self.affinity.clone();

        let Some(previous) = previous else {
            // First snapshot: synchronous, so the surface is populated
            // before submit returns.
            self.affinity.run_blocking(move || {
                let changeset = diff(&ItemCollection::empty(), &snapshot);
                let layout = builder.build(&snapshot, width, &affinity);
                apply_cycle(
                    &core, &listeners, builder, &affinity, snapshot, changeset, layout, class,
                    width,
                );
            });
            return;
        };

        let queue = Arc::clone(&self.queue);
        let width_cell = Arc::clone(&self.width);
        self.compute.handle().dispatch(move || {
            let changeset = diff(&previous, &snapshot);
            let layout = builder.build(&snapshot, width, &affinity);
            debug!(
                %class,
                items = snapshot.len(),
                ops = changeset.op_count(),
                "cycle computed; queueing apply"
            );
            let apply_affinity = affinity.clone();
            queue.enqueue(Box::new(move |completion| {
                apply_affinity.dispatch(move || {
                    let width_now = **width_cell.load();
                    apply_cycle(
                        &core, &listeners, builder, &affinity, snapshot, changeset, layout,
                        class, width_now,
                    );
                    completion.complete();
                });
            }));
        });
    }

    /// Record a new viewport width. Layout models computed for another width
    /// are stale and will be rebuilt by the next cycle.
    pub fn set_width(&self, width: f32) {
        self.width.store(Arc::new(width));
    }

    /// Scroll to `key`'s item and highlight it.
    ///
    /// If the item is already on the surface this happens right away;
    /// otherwise the request is kept pending and honored by the first cycle
    /// that renders the item.
    pub fn scroll_to_item(&self, key: ItemKey) {
        let core = Arc::clone(&self.core);
        self.affinity.dispatch(move || {
            let mut guard = core.lock().expect("reconciler core lock poisoned");
            let core = &mut *guard;
            if reveal(core, &key) {
                debug!(%key, "revealed item already on the surface");
            } else {
                core.pending_reveal = Some(PendingReveal {
                    key,
                    requested_at: Instant::now(),
                });
            }
        });
    }

    /// Register a callback invoked on the affinity thread after every
    /// applied cycle.
    pub fn on_update_applied(
        &self,
        callback: impl Fn(&AppliedUpdate) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.register(callback)
    }

    /// Remove a previously registered update callback.
    pub fn remove_update_listener(&self, id: ListenerId) {
        self.listeners.unregister(id);
    }

    /// Resume applying queued cycles.
    pub fn start(&self) {
        self.queue.start();
    }

    /// Pause the apply stage. In-flight work finishes; queued cycles are
    /// buffered, never dropped.
    pub fn stop(&self) {
        self.queue.stop();
    }

    /// Run `f` against the surface on the affinity thread, blocking for the
    /// result. Intended for inspection and for driving platform-side state
    /// in tests.
    pub fn with_surface<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        self.affinity.run_blocking(move || {
            f(&mut core.lock().expect("reconciler core lock poisoned").surface)
        })
    }
}

enum Decision {
    Incremental(Vec<Option<SlotHandle>>),
    Rebuild,
}

struct Anchor {
    /// New position and pre-update rectangle of the reference item.
    reference: Option<(usize, SlotRect)>,
    pinned: bool,
}

/// One full validate-apply-anchor-notify pass. Runs on the affinity thread.
#[allow(clippy::too_many_arguments)]
fn apply_cycle<S: Surface>(
    core: &Mutex<Core<S>>,
    listeners: &Listeners<AppliedUpdate>,
    builder: LayoutModelBuilder,
    affinity: &SerialHandle,
    new: ItemCollection,
    changeset: ChangeSet,
    layout: LayoutModel,
    class: UpdateClass,
    width_now: f32,
) {
    let event = {
        let mut guard = core.lock().expect("reconciler core lock poisoned");
        let core = &mut *guard;

        let layout_stale = !layout.is_valid_for(width_now);
        let layout = if layout_stale {
            debug!(
                computed_for = layout.width(),
                width = width_now,
                "layout model stale; remeasuring at the current width"
            );
            builder.build(&new, width_now, affinity)
        } else {
            layout
        };

        let decision = decide(core, &changeset, class, layout_stale, width_now);
        let anchor = capture_anchor(core, &changeset);

        let mode = match decision {
            Decision::Incremental(replayed) => {
                apply_incremental(core, &changeset, &layout, replayed);
                ApplyMode::Incremental
            }
            Decision::Rebuild => {
                rebuild(core, &new, &layout);
                ApplyMode::Rebuild
            }
        };
        core.current = new;
        core.applied_width = width_now;

        restore_anchor(core, &anchor);
        if let Some(pending) = core.pending_reveal.take() {
            if reveal(core, &pending.key) {
                debug!(
                    key = %pending.key,
                    waited_ms = pending.requested_at.elapsed().as_millis() as u64,
                    "revealed requested item"
                );
            } else {
                core.pending_reveal = Some(pending);
            }
        }

        info!(
            %class,
            mode = ?mode,
            items = core.current.len(),
            ops = changeset.op_count(),
            "cycle applied"
        );
        AppliedUpdate {
            class,
            mode,
            item_count: core.current.len(),
        }
    };
    // Outside the lock: a callback may call back into the reconciler.
    listeners.emit(&event);
}

fn decide<S: Surface>(
    core: &Core<S>,
    changeset: &ChangeSet,
    class: UpdateClass,
    layout_stale: bool,
    width_now: f32,
) -> Decision {
    if class.forces_rebuild() {
        info!(%class, "update class forces a rebuild");
        return Decision::Rebuild;
    }
    if layout_stale || core.applied_width != width_now {
        debug!(
            applied = core.applied_width,
            width = width_now,
            "width changed; remeasuring the whole surface"
        );
        return Decision::Rebuild;
    }
    if core.surface.visible_slots() != core.slot_map.handles() {
        warn!("surface slot state diverged from the applied map; rebuilding");
        return Decision::Rebuild;
    }
    match core.slot_map.replay(changeset) {
        Some(replayed) => Decision::Incremental(replayed),
        None => {
            warn!("changeset does not replay cleanly against the applied map; rebuilding");
            Decision::Rebuild
        }
    }
}

/// Patch the surface with exactly the changeset's operations.
///
/// Order of operations: destroy deleted slots, detach every moved slot, then
/// place insertions and reattachments in ascending new-position order. With
/// moved slots off screen, the remaining survivors sit in their final
/// relative order, so each ascending placement lands at its exact final
/// index.
fn apply_incremental<S: Surface>(
    core: &mut Core<S>,
    changeset: &ChangeSet,
    layout: &LayoutModel,
    mut replayed: Vec<Option<SlotHandle>>,
) {
    for &position in changeset.deleted.iter().rev() {
        let handle = core
            .slot_map
            .handle_at(position)
            .expect("replay validated deleted positions");
        core.surface.remove_slot(handle);
    }

    let mut moves: Vec<(usize, SlotHandle)> = changeset
        .moved
        .iter()
        .map(|&(source, target)| {
            let handle = core
                .slot_map
                .handle_at(source)
                .expect("replay validated move sources");
            (target, handle)
        })
        .collect();
    for &(_, handle) in &moves {
        core.surface.detach_slot(handle);
    }

    let mut placements: Vec<(usize, Option<SlotHandle>)> = changeset
        .inserted
        .iter()
        .map(|&position| (position, None))
        .collect();
    placements.extend(moves.drain(..).map(|(target, handle)| (target, Some(handle))));
    placements.sort_unstable_by_key(|&(position, _)| position);

    for (position, slot) in placements {
        match slot {
            None => {
                let size = layout.size_at(position).unwrap_or_default();
                let handle = core.surface.insert_slot(position, size);
                replayed[position] = Some(handle);
            }
            Some(handle) => core.surface.attach_slot(position, handle),
        }
    }

    core.slot_map = VisibleSlotMap::from_handles(
        replayed
            .into_iter()
            .map(|slot| slot.expect("replay covered every position"))
            .collect(),
    );
}

/// Discard every handle and rebuild the surface from the new snapshot.
fn rebuild<S: Surface>(core: &mut Core<S>, new: &ItemCollection, layout: &LayoutModel) {
    core.surface.clear_slots();
    let mut handles = Vec::with_capacity(new.len());
    for position in 0..new.len() {
        let size = layout.size_at(position).unwrap_or_default();
        handles.push(core.surface.insert_slot(position, size));
    }
    core.slot_map = VisibleSlotMap::from_handles(handles);
}

fn capture_anchor<S: Surface>(core: &Core<S>, changeset: &ChangeSet) -> Anchor {
    let reference = changeset.moved.first().and_then(|&(old_position, new_position)| {
        let handle = core.slot_map.handle_at(old_position)?;
        let rect = core.surface.slot_frame(handle)?;
        Some((new_position, rect))
    });
    let surface = &core.surface;
    let pinned =
        surface.viewport_offset() + surface.viewport_height() + END_SLACK >= surface.content_height();
    Anchor { reference, pinned }
}

fn restore_anchor<S: Surface>(core: &mut Core<S>, anchor: &Anchor) {
    if let Some((new_position, pre)) = anchor.reference {
        let post = core
            .slot_map
            .handle_at(new_position)
            .and_then(|handle| core.surface.slot_frame(handle));
        if let Some(post) = post {
            let dy = post.y - pre.y;
            if dy != 0.0 {
                let offset = core.surface.viewport_offset() + dy;
                debug!(dy, offset, "translating viewport to hold the reference item");
                core.surface.set_viewport_offset(offset);
            }
            return;
        }
    }
    if anchor.pinned {
        let end = (core.surface.content_height() - core.surface.viewport_height()).max(0.0);
        core.surface.set_viewport_offset(end);
    }
}

/// Scroll so `key`'s slot is inside the viewport and highlight it. Returns
/// false when the item is not currently rendered.
fn reveal<S: Surface>(core: &mut Core<S>, key: &ItemKey) -> bool {
    let Some(position) = core.current.index_of(key) else {
        return false;
    };
    let Some(handle) = core.slot_map.handle_at(position) else {
        return false;
    };
    let Some(rect) = core.surface.slot_frame(handle) else {
        return false;
    };

    let offset = core.surface.viewport_offset();
    let viewport = core.surface.viewport_height();
    let target = if rect.y < offset {
        rect.y
    } else if rect.bottom() > offset + viewport {
        rect.bottom() - viewport
    } else {
        offset
    };
    if target != offset {
        core.surface.set_viewport_offset(target.max(0.0));
    }
    core.surface.highlight_slot(handle);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSurface;
    use clist_core::{ItemKind, ItemSize, ListItem, SizeQuery};

    fn item(key: &str, height: f32) -> ListItem {
        ListItem::new(
            key,
            ItemKind("message"),
            SizeQuery::concurrency_safe(move |_| ItemSize::new(height)),
        )
    }

    fn snapshot(keys: &[(&str, f32)]) -> ItemCollection {
        ItemCollection::new(keys.iter().map(|&(k, h)| item(k, h)).collect()).unwrap()
    }

    fn layout_for(snapshot: &ItemCollection, width: f32) -> LayoutModel {
        LayoutModel::new(
            snapshot
                .iter()
                .map(|i| i.size_query().measure(width))
                .collect(),
            width,
        )
    }

    fn populated_core(keys: &[(&str, f32)], viewport: f32) -> Core<MockSurface> {
        let snapshot = snapshot(keys);
        let layout = layout_for(&snapshot, 320.0);
        let mut core = Core {
            surface: MockSurface::new(viewport),
            slot_map: VisibleSlotMap::new(),
            current: ItemCollection::empty(),
            applied_width: 320.0,
            pending_reveal: None,
        };
        rebuild(&mut core, &snapshot, &layout);
        core.current = snapshot;
        core
    }

    fn surface_keys_consistent(core: &Core<MockSurface>) {
        assert_eq!(core.surface.visible_slots(), core.slot_map.handles());
        assert_eq!(core.slot_map.len(), core.current.len());
    }

    #[test]
    fn incremental_patch_handles_scattered_moves() {
        // [a, b, c, d, e] -> [d, b, e, a, c]: b is untouched, everything
        // else moves. A sequential remove-and-insert scheme misplaces b;
        // detach-then-attach must not.
        let mut core = populated_core(
            &[("a", 10.0), ("b", 10.0), ("c", 10.0), ("d", 10.0), ("e", 10.0)],
            30.0,
        );
        let old = core.current.clone();
        let new = snapshot(&[("d", 10.0), ("b", 10.0), ("e", 10.0), ("a", 10.0), ("c", 10.0)]);
        let changeset = diff(&old, &new);
        let layout = layout_for(&new, 320.0);

        let before = core.slot_map.clone();
        let replayed = core.slot_map.replay(&changeset).unwrap();
        apply_incremental(&mut core, &changeset, &layout, replayed);
        core.current = new;

        surface_keys_consistent(&core);
        // Handle identity is preserved for every survivor.
        assert_eq!(core.slot_map.handle_at(1), before.handle_at(1)); // b
        assert_eq!(core.slot_map.handle_at(0), before.handle_at(3)); // d
        assert_eq!(core.slot_map.handle_at(3), before.handle_at(0)); // a
    }

    #[test]
    fn incremental_patch_mixed_update() {
        // [a, b, c] -> [n, a, c]: delete b, insert n, a shifts down.
        let mut core = populated_core(&[("a", 10.0), ("b", 20.0), ("c", 30.0)], 30.0);
        let old = core.current.clone();
        let new = snapshot(&[("n", 5.0), ("a", 10.0), ("c", 30.0)]);
        let changeset = diff(&old, &new);
        let layout = layout_for(&new, 320.0);

        let a_handle = core.slot_map.handle_at(0).unwrap();
        let replayed = core.slot_map.replay(&changeset).unwrap();
        apply_incremental(&mut core, &changeset, &layout, replayed);
        core.current = new;

        surface_keys_consistent(&core);
        assert_eq!(core.slot_map.handle_at(1), Some(a_handle));
        assert_eq!(core.surface.content_height(), 45.0);
    }

    #[test]
    fn rebuild_mints_fresh_handles() {
        let mut core = populated_core(&[("a", 10.0), ("b", 20.0)], 30.0);
        let before = core.slot_map.clone();
        let new = snapshot(&[("a", 10.0), ("b", 20.0)]);
        let layout = layout_for(&new, 320.0);

        rebuild(&mut core, &new, &layout);
        core.current = new;

        surface_keys_consistent(&core);
        assert_ne!(core.slot_map.handle_at(0), before.handle_at(0));
    }

    #[test]
    fn forced_class_rebuilds_even_when_consistent() {
        let core = populated_core(&[("a", 10.0)], 30.0);
        let changeset = ChangeSet::default();
        assert!(matches!(
            decide(&core, &changeset, UpdateClass::Reload, false, 320.0),
            Decision::Rebuild
        ));
        assert!(matches!(
            decide(&core, &changeset, UpdateClass::Normal, false, 320.0),
            Decision::Incremental(_)
        ));
    }

    #[test]
    fn width_change_remeasures_everything() {
        let core = populated_core(&[("a", 10.0)], 30.0);
        assert!(matches!(
            decide(&core, &ChangeSet::default(), UpdateClass::Normal, false, 375.0),
            Decision::Rebuild
        ));
    }

    #[test]
    fn diverged_surface_rebuilds() {
        let mut core = populated_core(&[("a", 10.0), ("b", 10.0)], 30.0);
        let rogue = core.slot_map.handle_at(0).unwrap();
        core.surface.remove_slot(rogue);
        assert!(matches!(
            decide(&core, &ChangeSet::default(), UpdateClass::Normal, false, 320.0),
            Decision::Rebuild
        ));
    }

    #[test]
    fn anchor_translates_by_reference_delta() {
        // Prepend x(15) before [a, b, c]; the reference is a, shifted down
        // by 15, so the offset follows exactly.
        let mut core = populated_core(&[("a", 10.0), ("b", 20.0), ("c", 30.0)], 40.0);
        core.surface.set_viewport_offset(5.0);
        let old = core.current.clone();
        let new = snapshot(&[("x", 15.0), ("a", 10.0), ("b", 20.0), ("c", 30.0)]);
        let changeset = diff(&old, &new);
        let layout = layout_for(&new, 320.0);

        let anchor = capture_anchor(&core, &changeset);
        let replayed = core.slot_map.replay(&changeset).unwrap();
        apply_incremental(&mut core, &changeset, &layout, replayed);
        core.current = new;
        restore_anchor(&mut core, &anchor);

        assert_eq!(core.surface.viewport_offset(), 20.0);
    }

    #[test]
    fn pinned_viewport_stays_at_end_on_append() {
        let mut core = populated_core(&[("a", 30.0), ("b", 30.0)], 40.0);
        core.surface.set_viewport_offset(20.0); // 20 + 40 == content 60
        let old = core.current.clone();
        let new = snapshot(&[("a", 30.0), ("b", 30.0), ("c", 25.0)]);
        let changeset = diff(&old, &new);
        let layout = layout_for(&new, 320.0);

        let anchor = capture_anchor(&core, &changeset);
        assert!(anchor.pinned);
        let replayed = core.slot_map.replay(&changeset).unwrap();
        apply_incremental(&mut core, &changeset, &layout, replayed);
        core.current = new;
        restore_anchor(&mut core, &anchor);

        assert_eq!(core.surface.viewport_offset(), 45.0);
    }

    #[test]
    fn unpinned_viewport_untouched_on_append() {
        let mut core = populated_core(&[("a", 30.0), ("b", 30.0)], 40.0);
        core.surface.set_viewport_offset(3.0);
        let old = core.current.clone();
        let new = snapshot(&[("a", 30.0), ("b", 30.0), ("c", 25.0)]);
        let changeset = diff(&old, &new);
        let layout = layout_for(&new, 320.0);

        let anchor = capture_anchor(&core, &changeset);
        assert!(!anchor.pinned);
        let replayed = core.slot_map.replay(&changeset).unwrap();
        apply_incremental(&mut core, &changeset, &layout, replayed);
        core.current = new;
        restore_anchor(&mut core, &anchor);

        assert_eq!(core.surface.viewport_offset(), 3.0);
    }

    #[test]
    fn reveal_scrolls_item_into_view_and_highlights() {
        let mut core = populated_core(&[("a", 30.0), ("b", 30.0), ("c", 30.0)], 40.0);
        assert!(reveal(&mut core, &"c".into()));
        // c spans [60, 90); viewport height 40 puts the offset at 50.
        assert_eq!(core.surface.viewport_offset(), 50.0);
        let c_handle = core.slot_map.handle_at(2).unwrap();
        assert_eq!(core.surface.highlighted(), [c_handle]);

        assert!(!reveal(&mut core, &"missing".into()));
    }
}
