#![forbid(unsafe_code)]

//! Named single-thread executors.
//!
//! A [`SerialExecutor`] owns one worker thread and runs submitted jobs
//! strictly in dispatch order. The engine uses two instances:
//!
//! - the **affinity** executor, which stands in for the platform UI thread:
//!   every visual-surface mutation and every affinity-only size query runs
//!   here;
//! - the **compute** executor, which keeps diff/layout computation for
//!   successive snapshots in submission order without occupying the affinity
//!   thread.
//!
//! [`SerialHandle`] is the cloneable submission side. `run_blocking` called
//! from the executor's own thread runs the job inline, so nested hops
//! (e.g. an apply step that rebuilds a layout, which in turn queries
//! affinity-only sizes) cannot self-deadlock.
//!
//! # Invariants
//!
//! 1. Jobs execute in dispatch order, one at a time.
//! 2. `is_current()` is true exactly on the executor's thread.
//! 3. Handles must not outlive their executor; `run_blocking` against a
//!    dropped executor falls back to running the job inline on the caller
//!    (logged), so no result is ever lost during teardown races.

use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::warn;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Job(Job),
    Shutdown,
}

/// Cloneable submission handle for a [`SerialExecutor`].
#[derive(Clone)]
pub struct SerialHandle {
    tx: mpsc::Sender<Message>,
    thread_id: Arc<OnceLock<ThreadId>>,
    name: &'static str,
}

impl SerialHandle {
    /// Whether the calling thread is the executor's worker thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.thread_id.get().copied() == Some(thread::current().id())
    }

    /// Submit a job without waiting for it. Jobs dispatched from one thread
    /// run in dispatch order.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        if let Err(mpsc::SendError(Message::Job(job))) = self.tx.send(Message::Job(Box::new(job)))
        {
            // Executor already shut down. Running inline preserves the work;
            // only reachable during teardown.
            warn!(executor = self.name, "dispatch after shutdown; running job inline");
            job();
        }
    }

    /// Submit a job and block until it has run, returning its result.
    ///
    /// Runs inline when already on the executor's thread.
    pub fn run_blocking<R, F>(&self, job: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return job();
        }
        let (tx, rx) = mpsc::channel();
        self.dispatch(move || {
            // The receiver may be gone if the caller unwound; nothing to do.
            let _ = tx.send(job());
        });
        rx.recv()
            .expect("serial executor dropped while a blocking job was pending")
    }
}

/// A single worker thread executing jobs in dispatch order.
pub struct SerialExecutor {
    handle: SerialHandle,
    worker: Option<JoinHandle<()>>,
}

impl SerialExecutor {
    /// Spawn an executor whose worker thread carries `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::channel::<Message>();
        let thread_id = Arc::new(OnceLock::new());

        let id_slot = Arc::clone(&thread_id);
        let worker = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let _ = id_slot.set(thread::current().id());
                while let Ok(message) = rx.recv() {
                    match message {
                        Message::Job(job) => job(),
                        Message::Shutdown => break,
                    }
                }
            })
            .expect("spawning a serial executor worker cannot fail on supported platforms");

        Self {
            handle: SerialHandle {
                tx,
                thread_id,
                name,
            },
            worker: Some(worker),
        }
    }

    /// A cloneable submission handle.
    #[must_use]
    pub fn handle(&self) -> SerialHandle {
        self.handle.clone()
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        // Jobs dispatched before this sentinel still run; the worker exits
        // once it reaches the sentinel.
        let _ = self.handle.tx.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
