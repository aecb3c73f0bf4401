//! Task scheduling glue between the owner thread and the async runtime.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::trace;

/// Cooperative cancellation flag handed to background work.
///
/// Cancellation is advisory: the holder checks [`CancelToken::is_cancelled`]
/// at its own checkpoints and abandons its result. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Owner-thread task queue with a bridge to the async runtime.
///
/// Models live on one thread and are not `Send`. Work that must run on that
/// thread but after the current call stack unwinds goes through [`spawn_local`]
/// and runs when the owner calls [`run_pending`]. Work that may block goes
/// through [`spawn_background`] onto the shared runtime and reports back via
/// a channel drained by the owning model.
///
/// [`spawn_local`]: Scheduler::spawn_local
/// [`run_pending`]: Scheduler::run_pending
/// [`spawn_background`]: Scheduler::spawn_background
#[derive(Default)]
pub struct Scheduler {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    draining: Cell<bool>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a closure to run on the owner thread during the next
    /// [`run_pending`](Self::run_pending) pass. FIFO with respect to other
    /// deferred closures.
    pub fn spawn_local(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Returns the number of queued closures.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs every queued closure in FIFO order and returns how many ran.
    /// Closures deferred while draining run in the same pass. Reentrant
    /// calls from inside a task are no-ops.
    pub fn run_pending(&self) -> usize {
        if self.draining.get() {
            return 0;
        }
        self.draining.set(true);
        let mut ran = 0;
        loop {
            let task = self.queue.borrow_mut().pop_front();
            let Some(task) = task else { break };
            task();
            ran += 1;
        }
        self.draining.set(false);
        trace!(ran, "drained deferred tasks");
        ran
    }

    /// Spawns a future onto the async runtime. The handle can be awaited by
    /// tests to observe completion before pumping results back.
    pub fn spawn_background<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }
}
