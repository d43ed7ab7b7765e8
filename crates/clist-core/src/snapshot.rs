#![forbid(unsafe_code)]

//! Immutable ordered snapshots of the item list.
//!
//! An [`ItemCollection`] is created by the data source on every model change
//! and never mutated afterwards. Position is the index in the sequence; a
//! `key → position` map is built once at construction and shared with every
//! clone (the collection is `Arc`-backed, so cloning is cheap and snapshots
//! can be handed across threads freely).
//!
//! # Duplicate keys
//!
//! Two items with the same key within one snapshot would make the positional
//! differ's index maps ambiguous. Rather than inheriting silent
//! last-write-wins map behavior, construction rejects such input with
//! [`SnapshotError::DuplicateKey`].

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::item::{ItemKey, ListItem};

/// Error produced when a snapshot cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The same key appeared at two positions within one snapshot.
    DuplicateKey {
        /// The offending key.
        key: ItemKey,
        /// Position of the first occurrence.
        first: usize,
        /// Position of the second occurrence.
        second: usize,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { key, first, second } => write!(
                f,
                "duplicate item key {key} at positions {first} and {second}"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

struct CollectionInner {
    items: Vec<ListItem>,
    index: AHashMap<ItemKey, usize>,
}

/// An immutable, ordered snapshot of items with stable identity.
#[derive(Clone)]
pub struct ItemCollection {
    inner: Arc<CollectionInner>,
}

impl ItemCollection {
    /// Build a snapshot from an ordered item list.
    ///
    /// Fails if any key appears more than once.
    pub fn new(items: Vec<ListItem>) -> Result<Self, SnapshotError> {
        let mut index = AHashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if let Some(first) = index.insert(item.key().clone(), position) {
                return Err(SnapshotError::DuplicateKey {
                    key: item.key().clone(),
                    first,
                    second: position,
                });
            }
        }
        Ok(Self {
            inner: Arc::new(CollectionInner { items, index }),
        })
    }

    /// The empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                items: Vec::new(),
                index: AHashMap::new(),
            }),
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    /// Whether the snapshot holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// The item at `position`, if in bounds.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&ListItem> {
        self.inner.items.get(position)
    }

    /// The position of `key`, if present.
    #[must_use]
    pub fn index_of(&self, key: &ItemKey) -> Option<usize> {
        self.inner.index.get(key).copied()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.inner.index.contains_key(key)
    }

    /// Iterate items in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ListItem> {
        self.inner.items.iter()
    }

    /// The ordered key sequence (primarily for tests and diagnostics).
    #[must_use]
    pub fn keys(&self) -> Vec<ItemKey> {
        self.inner.items.iter().map(|i| i.key().clone()).collect()
    }
}

impl fmt::Debug for ItemCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.iter()).finish()
    }
}
