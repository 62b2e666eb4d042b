//! A thread-pool [`ExecutorService`] on top of tokio's blocking pool.

use super::config::ExecutorConfig;
use super::handle::panic_message;
use super::{Executor, ExecutorService};
use crate::errors::{ContextPreservedError, ExecutorError};
use crate::task::Job;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Counts {
    shutdown: bool,
    active: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    counts: Mutex<Counts>,
    idle: Condvar,
}

impl PoolState {
    /// Registers a job unless the pool is shut down.
    fn admit(self: &Arc<Self>) -> Option<ActiveGuard> {
        let mut counts = self.counts.lock();
        if counts.shutdown {
            return None;
        }
        counts.active += 1;
        Some(ActiveGuard {
            state: Arc::clone(self),
        })
    }
}

/// Marks one admitted job as finished when dropped, whether it ran, panicked
/// or was discarded by the runtime.
struct ActiveGuard {
    state: Arc<PoolState>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut counts = self.state.counts.lock();
        counts.active = counts.active.saturating_sub(1);
        if counts.active == 0 {
            self.state.idle.notify_all();
        }
    }
}

/// Runs jobs on the blocking threads of a tokio runtime.
///
/// Blocking threads are reused between jobs, so anything a job leaves in
/// thread-local storage is visible to the next job on that thread. Wrap
/// the service in a decorator from this crate to keep the MDC under control.
pub struct TokioExecutorService {
    runtime: Option<Runtime>,
    handle: Handle,
    state: Arc<PoolState>,
}

impl TokioExecutorService {
    /// Builds a dedicated runtime from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ContextPreservedError::InvalidArgument` for a zero thread
    /// count, or `ContextPreservedError::Io` if the runtime cannot start.
    pub fn new(config: &ExecutorConfig) -> Result<Self, ContextPreservedError> {
        config.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .thread_keep_alive(config.keep_alive())
            .enable_time()
            .build()?;
        debug!(
            worker_threads = config.worker_threads,
            max_blocking_threads = config.max_blocking_threads,
            thread_name = %config.thread_name,
            "Executor service started"
        );
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
            state: Arc::default(),
        })
    }

    /// Builds a service from the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ContextPreservedError::Io` if the runtime cannot start.
    pub fn with_defaults() -> Result<Self, ContextPreservedError> {
        Self::new(&ExecutorConfig::default())
    }

    /// Runs jobs on an existing runtime. The runtime stays owned by the
    /// caller and outlives [`shutdown`](ExecutorService::shutdown).
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
            state: Arc::default(),
        }
    }

    /// Returns the number of accepted jobs that have not finished.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.counts.lock().active
    }
}

impl Executor for TokioExecutorService {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        let Some(guard) = self.state.admit() else {
            warn!("Rejected job submitted after shutdown");
            return Err(ExecutorError::rejected("executor service is shut down"));
        };
        self.handle.spawn_blocking(move || {
            let _guard = guard;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
                warn!(panic = %panic_message(&*payload), "Job panicked");
            }
        });
        Ok(())
    }
}

impl ExecutorService for TokioExecutorService {
    fn shutdown(&self) {
        let mut counts = self.state.counts.lock();
        if !counts.shutdown {
            counts.shutdown = true;
            debug!(active = counts.active, "Executor service shutting down");
        }
        if counts.active == 0 {
            self.state.idle.notify_all();
        }
    }

    fn is_shutdown(&self) -> bool {
        self.state.counts.lock().shutdown
    }

    fn is_terminated(&self) -> bool {
        let counts = self.state.counts.lock();
        counts.shutdown && counts.active == 0
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut counts = self.state.counts.lock();
        while !(counts.shutdown && counts.active == 0) {
            match deadline {
                None => self.state.idle.wait(&mut counts),
                Some(deadline) => {
                    if self.state.idle.wait_until(&mut counts, deadline).timed_out() {
                        return counts.shutdown && counts.active == 0;
                    }
                }
            }
        }
        true
    }
}

impl Drop for TokioExecutorService {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for TokioExecutorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.state.counts.lock();
        f.debug_struct("TokioExecutorService")
            .field("owns_runtime", &self.runtime.is_some())
            .field("shutdown", &counts.shutdown)
            .field("active", &counts.active)
            .finish()
    }
}
