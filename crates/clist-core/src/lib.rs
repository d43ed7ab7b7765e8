#![forbid(unsafe_code)]

//! Core data model for the clist reconciliation engine.
//!
//! This crate defines the value types the rest of the engine is built on:
//!
//! - [`ListItem`]: an identity-carrying chat list entry with an attached
//!   size-query strategy.
//! - [`ItemCollection`]: an immutable, ordered snapshot of items with a
//!   `key → position` index.
//! - [`ChangeSet`]: the insert/delete/move description transforming one
//!   snapshot into the next, produced by [`diff`].
//! - [`UpdateClass`]: the caller-supplied classification of a snapshot
//!   delivery, used downstream to pick between incremental patching and a
//!   full rebuild.
//!
//! Everything here is a plain value: snapshots are immutable after
//! construction, changesets are derived and transient, and nothing in this
//! crate touches threads or surfaces.

pub mod changeset;
pub mod diff;
pub mod item;
pub mod snapshot;
pub mod update_class;

pub use changeset::ChangeSet;
pub use diff::diff;
pub use item::{ItemKey, ItemKind, ItemSize, ListItem, QueryCapability, SizeQuery};
pub use snapshot::{ItemCollection, SnapshotError};
pub use update_class::UpdateClass;
