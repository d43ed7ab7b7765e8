#![forbid(unsafe_code)]

//! Serialized execution primitives for the clist reconciliation engine.
//!
//! Three small building blocks live here:
//!
//! - [`UpdateQueue`]: a FIFO, at-most-one-in-flight task queue driven by
//!   single-use completion continuations. Reconciliation cycles are applied
//!   through it, which is what guarantees structural updates never overlap.
//! - [`SerialExecutor`]: a named single-thread executor with a cloneable
//!   [`SerialHandle`]. The engine runs two of these: the *affinity* thread
//!   that owns all visual-surface mutation, and the *compute* stage that
//!   keeps diff/layout work in submission order.
//! - [`Listeners`]: an explicit callback registry with id-based
//!   unregistration, replacing delegate/notification-center patterns.
//!
//! None of these know anything about items or surfaces; they are plain
//! scheduling plumbing.

pub mod listeners;
pub mod queue;
pub mod serial;

pub use listeners::{ListenerId, Listeners};
pub use queue::{Completion, Task, UpdateQueue};
pub use serial::{SerialExecutor, SerialHandle};
