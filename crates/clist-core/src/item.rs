#![forbid(unsafe_code)]

//! Items and their size-query strategies.
//!
//! A [`ListItem`] is the unit the engine reconciles: a stable identity
//! ([`ItemKey`]), a kind discriminator, an opaque payload for the renderer,
//! and a [`SizeQuery`], the strategy value that computes the item's extent
//! for a given viewport width.
//!
//! # Invariants
//!
//! 1. **Identity is the key.** Two items with equal keys in consecutive
//!    snapshots refer to the same logical item, whatever their payloads.
//! 2. **Kind is key-stable.** The kind of a given key is assumed not to
//!    change across snapshots. This is a documented assumption, not an
//!    enforced one; violating it produces unspecified (but memory-safe)
//!    visual results.
//! 3. **Size queries are infallible.** A query always returns a size. If an
//!    item's capability flag changes between two calls for the same key,
//!    behavior is unspecified.
//!
//! The capability flag on [`SizeQuery`] is explicit rather than inferred
//! from a runtime thread check, so the layout builder's partitioning step
//! can be tested without any platform thread machinery.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Stable per-item identity, preserved across consecutive snapshots that
/// refer to the same logical item.
///
/// Cheap to clone (`Arc<str>` backed); used as the hash key in every
/// `key → position` index.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey(Arc<str>);

impl ItemKey {
    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemKey({:?})", &*self.0)
    }
}

/// Kind discriminator for an item (e.g. `"message"`, `"date-header"`,
/// `"typing-indicator"`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ItemKind(pub &'static str);

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Vertical extent of one item at a given width.
///
/// The width it was computed for is carried by the enclosing layout model,
/// not by the size itself.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ItemSize {
    /// Height of the item's content.
    pub height: f32,
    /// Spacing below the item before the next one.
    pub bottom_margin: f32,
}

impl ItemSize {
    /// Create a size with no bottom margin.
    #[must_use]
    pub fn new(height: f32) -> Self {
        Self {
            height,
            bottom_margin: 0.0,
        }
    }

    /// Attach a bottom margin.
    #[must_use]
    pub fn with_bottom_margin(mut self, margin: f32) -> Self {
        self.bottom_margin = margin;
        self
    }

    /// Total extent this item contributes to the content height.
    #[must_use]
    pub fn extent(&self) -> f32 {
        self.height + self.bottom_margin
    }
}

/// Whether a size query may run on any worker thread or must run on the
/// single designated affinity thread.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum QueryCapability {
    /// The query is safe to evaluate from any thread concurrently.
    ConcurrencySafe,
    /// The query touches thread-affine state and must run on the affinity
    /// thread.
    AffinityOnly,
}

impl fmt::Display for QueryCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConcurrencySafe => f.write_str("concurrency-safe"),
            Self::AffinityOnly => f.write_str("affinity-only"),
        }
    }
}

/// Per-item size measurement strategy.
///
/// Selected once at snapshot-construction time and carried by the item,
/// replacing polymorphic dispatch over an item-type hierarchy. The closure
/// maps a viewport width to an [`ItemSize`].
#[derive(Clone)]
pub struct SizeQuery {
    capability: QueryCapability,
    measure: Arc<dyn Fn(f32) -> ItemSize + Send + Sync>,
}

impl SizeQuery {
    /// A query that may run on any worker thread.
    pub fn concurrency_safe(measure: impl Fn(f32) -> ItemSize + Send + Sync + 'static) -> Self {
        Self {
            capability: QueryCapability::ConcurrencySafe,
            measure: Arc::new(measure),
        }
    }

    /// A query that must run on the affinity thread.
    pub fn affinity_only(measure: impl Fn(f32) -> ItemSize + Send + Sync + 'static) -> Self {
        Self {
            capability: QueryCapability::AffinityOnly,
            measure: Arc::new(measure),
        }
    }

    /// The query's declared capability.
    #[must_use]
    pub fn capability(&self) -> QueryCapability {
        self.capability
    }

    /// Compute the item's size for `width`.
    #[must_use]
    pub fn measure(&self, width: f32) -> ItemSize {
        (self.measure)(width)
    }
}

impl fmt::Debug for SizeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeQuery")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// One entry of a chat list snapshot.
#[derive(Clone)]
pub struct ListItem {
    key: ItemKey,
    kind: ItemKind,
    size_query: SizeQuery,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ListItem {
    /// Create an item with an empty payload.
    pub fn new(key: impl Into<ItemKey>, kind: ItemKind, size_query: SizeQuery) -> Self {
        Self {
            key: key.into(),
            kind,
            size_query,
            payload: Arc::new(()),
        }
    }

    /// Attach an opaque renderer payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Any + Send + Sync) -> Self {
        self.payload = Arc::new(payload);
        self
    }

    /// The item's stable identity.
    #[must_use]
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// The item's kind discriminator.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// The item's size-query strategy.
    #[must_use]
    pub fn size_query(&self) -> &SizeQuery {
        &self.size_query
    }

    /// Downcast the payload to a concrete type.
    #[must_use]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListItem")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("capability", &self.size_query.capability())
            .finish_non_exhaustive()
    }
}
