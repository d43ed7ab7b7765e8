#![forbid(unsafe_code)]

//! The single-flight update queue.
//!
//! Tasks are opaque units of work that receive a [`Completion`] continuation
//! and must fire it exactly once. The queue dispatches tasks strictly in
//! submission order and never starts task *n+1* before task *n*'s completion
//! has fired, even when the task hands its continuation to another thread
//! and returns immediately.
//!
//! # Guarantees
//!
//! 1. **FIFO**: tasks begin in the exact order they were enqueued.
//! 2. **Single-flight**: at most one task is executing (i.e. has an unfired
//!    completion) at any time.
//! 3. **No silent loss**: [`UpdateQueue::stop`] buffers tasks, it never
//!    discards them, and it does not abort the in-flight task.
//! 4. **No coalescing, no timeouts**: if tasks arrive faster than they
//!    complete they accumulate without bound. Callers that want to avoid
//!    pile-up must coalesce upstream.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Completion fired twice | Impossible: `complete()` consumes it |
//! | Completion dropped unfired | Queue logs an error and permanently stops dispatching ([`UpdateQueue::is_stalled`]) |
//! | Task panics on the worker | The unwind drops the completion unfired, which stalls the queue as above |
//!
//! A dropped-unfired completion is a caller contract violation, not a
//! runtime condition the queue recovers from; it is meant to be caught in
//! testing.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

/// A unit of work submitted to the queue. Must fire its [`Completion`]
/// exactly once, from any thread.
pub type Task = Box<dyn FnOnce(Completion) + Send + 'static>;

struct QueueState {
    tasks: VecDeque<Task>,
    /// Dispatch enabled. Toggled by `start` / `stop`.
    running: bool,
    /// A dispatched task's completion has not fired yet.
    in_flight: bool,
    /// A completion was dropped unfired; dispatch is permanently disabled.
    stalled: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    cond: Condvar,
}

/// FIFO, at-most-one-in-flight task queue.
///
/// The queue owns a worker thread that invokes tasks; a task may do its work
/// inline or hand the [`Completion`] elsewhere. Dropping the queue shuts the
/// worker down after the currently-invoked task closure returns; buffered
/// tasks are discarded only at drop.
pub struct UpdateQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl UpdateQueue {
    /// Create a queue in the running state.
    #[must_use]
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                running: true,
                in_flight: false,
                stalled: false,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("clist-update-queue".into())
            .spawn(move || worker_loop(&worker_shared))
            .expect("spawning the update queue worker cannot fail on supported platforms");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Submit a task. Never blocks the caller; the task runs once every
    /// earlier task has completed and the queue is running.
    pub fn enqueue(&self, task: Task) {
        let mut state = self.shared.state.lock().expect("queue lock poisoned");
        state.tasks.push_back(task);
        debug!(queued = state.tasks.len(), "task enqueued");
        drop(state);
        self.shared.cond.notify_all();
    }

    /// Resume dispatching buffered tasks.
    pub fn start(&self) {
        let mut state = self.shared.state.lock().expect("queue lock poisoned");
        state.running = true;
        drop(state);
        self.shared.cond.notify_all();
    }

    /// Pause dispatch. The in-flight task (if any) keeps running; queued
    /// tasks are buffered, not discarded.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock().expect("queue lock poisoned");
        state.running = false;
    }

    /// Whether a completion was dropped without firing, permanently halting
    /// dispatch. Exists so tests can assert on the contract violation.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        self.shared
            .state
            .lock()
            .expect("queue lock poisoned")
            .stalled
    }

    /// Number of tasks waiting to be dispatched (excluding the in-flight
    /// one).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared
            .state
            .lock()
            .expect("queue lock poisoned")
            .tasks
            .len()
    }
}

impl Default for UpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UpdateQueue {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("queue lock poisoned");
            state.shutdown = true;
        }
        self.shared.cond.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock().expect("queue lock poisoned");
            loop {
                if state.shutdown {
                    return;
                }
                if state.running && !state.in_flight && !state.stalled {
                    if let Some(task) = state.tasks.pop_front() {
                        state.in_flight = true;
                        break task;
                    }
                }
                state = shared.cond.wait(state).expect("queue lock poisoned");
            }
        };
        task(Completion {
            shared: Arc::clone(shared),
            fired: false,
        });
    }
}

/// Single-use continuation handed to each task.
///
/// `complete()` consumes the continuation, so firing twice is impossible by
/// construction. Dropping it unfired stalls the queue (see module docs).
pub struct Completion {
    shared: Arc<Shared>,
    fired: bool,
}

impl Completion {
    /// Signal that the task has finished; the queue may dispatch the next
    /// task.
    pub fn complete(mut self) {
        self.fired = true;
        let mut state = self.shared.state.lock().expect("queue lock poisoned");
        state.in_flight = false;
        drop(state);
        self.shared.cond.notify_all();
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.fired {
            return;
        }
        error!("update task dropped its completion without firing; queue is stalled");
        let mut state = self.shared.state.lock().expect("queue lock poisoned");
        state.stalled = true;
        drop(state);
        self.shared.cond.notify_all();
    }
}
