//! Handles to submitted tasks.

use super::batch::CompletionQueue;
use crate::errors::TaskError;
use crate::task::Job;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

enum State<T, E> {
    Pending,
    Running,
    Done(Result<T, TaskError<E>>),
    Taken,
}

struct Shared<T, E> {
    state: Mutex<State<T, E>>,
    done: Condvar,
    listener: Option<(CompletionQueue, usize)>,
}

impl<T, E> Shared<T, E> {
    /// Moves a pending task to running. False if it was cancelled first.
    fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, State::Pending) {
            *state = State::Running;
            true
        } else {
            false
        }
    }

    /// Stores the outcome unless one is already there.
    fn complete(&self, outcome: Result<T, TaskError<E>>) -> bool {
        self.settle(outcome, |state| matches!(state, State::Pending | State::Running))
    }

    /// Cancels only if the body has not started.
    fn cancel(&self) -> bool {
        self.settle(Err(TaskError::Cancelled), |state| matches!(state, State::Pending))
    }

    fn settle(&self, outcome: Result<T, TaskError<E>>, allowed: fn(&State<T, E>) -> bool) -> bool {
        {
            let mut state = self.state.lock();
            if !allowed(&*state) {
                return false;
            }
            *state = State::Done(outcome);
            self.done.notify_all();
        }
        if let Some((queue, index)) = &self.listener {
            queue.push(*index);
        }
        true
    }

    fn is_finished(&self) -> bool {
        matches!(*self.state.lock(), State::Done(_) | State::Taken)
    }

    /// Blocks until the task finished or `deadline` passes.
    fn block_until_done(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        loop {
            if matches!(*state, State::Done(_) | State::Taken) {
                return true;
            }
            match deadline {
                None => self.done.wait(&mut state),
                Some(deadline) => {
                    if self.done.wait_until(&mut state, deadline).timed_out() {
                        return matches!(*state, State::Done(_) | State::Taken);
                    }
                }
            }
        }
    }

    fn take(&self) -> Option<Result<T, TaskError<E>>> {
        let mut state = self.state.lock();
        if !matches!(*state, State::Done(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, State::Taken) {
            State::Done(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Completes the task as cancelled if its job is dropped without running,
/// so no handle waits forever on a job an engine discarded.
struct Completer<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Drop for Completer<T, E> {
    fn drop(&mut self) {
        self.shared.complete(Err(TaskError::Cancelled));
    }
}

/// Builds the job an engine runs and the handle the submitter keeps.
pub(crate) fn task_pair<F, T, E>(
    task: F,
    listener: Option<(CompletionQueue, usize)>,
) -> (Job, TaskHandle<T, E>)
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending),
        done: Condvar::new(),
        listener,
    });
    let completer = Completer {
        shared: Arc::clone(&shared),
    };

    let job: Job = Box::new(move || {
        if !completer.shared.begin() {
            return;
        }
        let outcome = match catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(TaskError::Failed(error)),
            Err(payload) => Err(TaskError::Panicked(panic_message(&*payload))),
        };
        completer.shared.complete(outcome);
    });

    (job, TaskHandle { shared })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// The submitter's side of a task handed to an [`ExecutorService`](super::ExecutorService).
pub struct TaskHandle<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Returns true once the task has an outcome (success, failure, or
    /// cancellation).
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.shared.is_finished()
    }

    /// Returns true if the task was cancelled before it started.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            *self.shared.state.lock(),
            State::Done(Err(TaskError::Cancelled))
        )
    }

    /// Cancels the task if it has not started yet.
    ///
    /// A task that is already running is left to finish; there is no
    /// preemption. Returns true if this call cancelled it.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Blocks until the task completes and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns the task's failure, panic, or cancellation.
    pub fn wait(self) -> Result<T, TaskError<E>> {
        loop {
            self.shared.block_until_done(None);
            if let Some(outcome) = self.shared.take() {
                return outcome;
            }
        }
    }

    /// Waits up to `timeout`. On timeout the handle is returned so the caller
    /// can keep waiting or cancel. A timeout too large to represent as a
    /// deadline waits without bound.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` if the task did not complete in time.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Result<T, TaskError<E>>, Self> {
        if !self.shared.block_until_done(Instant::now().checked_add(timeout)) {
            return Err(self);
        }
        match self.shared.take() {
            Some(outcome) => Ok(outcome),
            None => Err(self),
        }
    }

    pub(crate) fn block_until(&self, deadline: Option<Instant>) -> bool {
        self.shared.block_until_done(deadline)
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("done", &self.is_done())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_job_completes_handle() {
        let (job, handle) = task_pair(|| Ok::<_, String>(5), None);
        assert!(!handle.is_done());

        job();

        assert!(handle.is_done());
        assert_eq!(handle.wait(), Ok(5));
    }

    #[test]
    fn test_failure_is_kept_verbatim() {
        let (job, handle) = task_pair(|| Err::<u8, _>("bad input".to_string()), None);
        job();
        assert_eq!(handle.wait(), Err(TaskError::Failed("bad input".to_string())));
    }

    #[test]
    fn test_panic_is_reported() {
        let (job, handle) = task_pair(|| -> Result<u8, String> { panic!("exploded") }, None);
        job();
        assert_eq!(handle.wait(), Err(TaskError::Panicked("exploded".to_string())));
    }

    #[test]
    fn test_cancel_before_start_skips_body() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let (job, handle) = task_pair(
            move || {
                *flag.lock() = true;
                Ok::<_, String>(())
            },
            None,
        );

        assert!(handle.cancel());
        job();

        assert!(!*ran.lock());
        assert!(handle.is_cancelled());
        assert_eq!(handle.wait(), Err(TaskError::Cancelled));
    }

    #[test]
    fn test_dropped_job_cancels_handle() {
        let (job, handle) = task_pair(|| Ok::<_, String>(1), None);
        drop(job);
        assert_eq!(handle.wait(), Err(TaskError::Cancelled));
    }

    #[test]
    fn test_wait_timeout_returns_handle() {
        let (job, handle) = task_pair(|| Ok::<_, String>("late"), None);

        let handle = handle.wait_timeout(Duration::from_millis(10)).unwrap_err();
        thread::spawn(job).join().unwrap();

        assert_eq!(handle.wait_timeout(Duration::from_secs(1)).unwrap(), Ok("late"));
    }

    #[test]
    fn test_wait_timeout_with_max_duration() {
        let (job, handle) = task_pair(|| Ok::<_, String>("eventually"), None);
        let runner = thread::spawn(job);

        assert_eq!(handle.wait_timeout(Duration::MAX).unwrap(), Ok("eventually"));
        runner.join().unwrap();
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let (job, handle) = task_pair(|| Ok::<_, String>(3), None);
        job();
        assert!(!handle.cancel());
        assert_eq!(handle.wait(), Ok(3));
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&7_u8), "<non-string panic payload>");
    }
}
