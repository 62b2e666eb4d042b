//! Test doubles for coordinators, executors, and tasks.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::context::{mdc, ContextCoordinator, ContextMap};
use crate::errors::{ExecutorError, InvokeError};
use crate::executor::{batch, Executor, ExecutorService, TaskHandle};
use crate::task::Job;

/// A coordinator over the MDC that counts how often it is used.
#[derive(Debug, Clone, Default)]
pub struct RecordingCoordinator {
    reads: Arc<AtomicUsize>,
    installs: Arc<AtomicUsize>,
}

impl RecordingCoordinator {
    /// Creates a coordinator with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of `read` calls so far, across all clones.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Returns the number of `install` calls so far, across all clones.
    #[must_use]
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl ContextCoordinator for RecordingCoordinator {
    type Snapshot = ContextMap;

    fn read(&self) -> Option<ContextMap> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        mdc::copy_of_context_map()
    }

    fn install(&self, context: Option<ContextMap>) {
        self.installs.fetch_add(1, Ordering::SeqCst);
        mdc::set_context_map(context);
    }
}

/// Records the MDC a task observed when it ran.
#[derive(Debug, Clone, Default)]
pub struct ContextProbe {
    observed: Arc<Mutex<Vec<Option<ContextMap>>>>,
}

impl ContextProbe {
    /// Creates an empty probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an action that records the running thread's MDC.
    pub fn recorder(&self) -> impl FnOnce() + Send + 'static {
        let observed = Arc::clone(&self.observed);
        move || observed.lock().push(mdc::copy_of_context_map())
    }

    /// Returns everything recorded, in run order.
    #[must_use]
    pub fn observed(&self) -> Vec<Option<ContextMap>> {
        self.observed.lock().clone()
    }

    /// Returns the most recent observation; `None` if nothing ran or the
    /// last run saw no context.
    #[must_use]
    pub fn last(&self) -> Option<ContextMap> {
        self.observed.lock().last().cloned().flatten()
    }
}

/// Runs every job on the calling thread, and counts batch calls so tests can
/// tell batches from individual submissions.
#[derive(Debug, Default)]
pub struct InlineExecutor {
    shutdown: AtomicBool,
    batch_calls: AtomicUsize,
}

impl InlineExecutor {
    /// Creates a running executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of `invoke_*` calls received.
    #[must_use]
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(ExecutorError::rejected("inline executor is shut down"));
        }
        job();
        Ok(())
    }
}

impl ExecutorService for InlineExecutor {
    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn is_terminated(&self) -> bool {
        self.is_shutdown()
    }

    fn await_termination(&self, _timeout: Duration) -> bool {
        self.is_terminated()
    }

    fn invoke_any<F, T, E>(&self, tasks: Vec<F>) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        batch::invoke_any(self, tasks, None)
    }

    fn invoke_any_timeout<F, T, E>(&self, tasks: Vec<F>, timeout: Duration) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        batch::invoke_any(self, tasks, Some(timeout))
    }

    fn invoke_all<F, T, E>(&self, tasks: Vec<F>) -> Result<Vec<TaskHandle<T, E>>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        batch::invoke_all(self, tasks, None)
    }

    fn invoke_all_timeout<F, T, E>(
        &self,
        tasks: Vec<F>,
        timeout: Duration,
    ) -> Result<Vec<TaskHandle<T, E>>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        batch::invoke_all(self, tasks, Some(timeout))
    }
}

/// Holds jobs until the test decides to run them.
#[derive(Default)]
pub struct DeferredExecutor {
    pending: Mutex<VecDeque<Job>>,
}

impl DeferredExecutor {
    /// Creates an executor with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Runs every queued job, in order, on one fresh thread whose MDC starts
    /// empty. Returns how many jobs ran.
    pub fn run_pending_on_new_thread(&self) -> usize {
        let jobs: Vec<Job> = self.pending.lock().drain(..).collect();
        let count = jobs.len();
        thread::spawn(move || jobs.into_iter().for_each(|job| job()))
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
        count
    }
}

impl Executor for DeferredExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        self.pending.lock().push_back(job);
        Ok(())
    }
}

impl std::fmt::Debug for DeferredExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}
