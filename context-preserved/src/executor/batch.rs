//! First-success and wait-all over any [`Executor`].

use super::handle::{task_pair, TaskHandle};
use super::Executor;
use crate::errors::{ExecutorError, InvokeError, TaskError};
use crate::utils::validation::require_non_empty;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Indices of batch members in the order they completed.
#[derive(Clone, Default)]
pub(crate) struct CompletionQueue {
    inner: Arc<(Mutex<VecDeque<usize>>, Condvar)>,
}

impl CompletionQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, index: usize) {
        let (queue, ready) = &*self.inner;
        queue.lock().push_back(index);
        ready.notify_one();
    }

    /// Pops the next completed index, waiting until `deadline` if given.
    pub(crate) fn pop(&self, deadline: Option<Instant>) -> Option<usize> {
        let (queue, ready) = &*self.inner;
        let mut queue = queue.lock();
        loop {
            if let Some(index) = queue.pop_front() {
                return Some(index);
            }
            match deadline {
                None => ready.wait(&mut queue),
                Some(deadline) => {
                    if ready.wait_until(&mut queue, deadline).timed_out() {
                        return queue.pop_front();
                    }
                }
            }
        }
    }
}

fn cancel_all<T, E>(handles: &[Option<TaskHandle<T, E>>]) {
    for handle in handles.iter().flatten() {
        handle.cancel();
    }
}

/// Submits every task and returns the first successful result.
pub(crate) fn invoke_any<S, F, T, E>(
    service: &S,
    tasks: Vec<F>,
    timeout: Option<Duration>,
) -> Result<T, InvokeError<E>>
where
    S: Executor + ?Sized,
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    require_non_empty("tasks", &tasks).map_err(ExecutorError::from)?;
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let queue = CompletionQueue::new();

    let mut handles = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.into_iter().enumerate() {
        let (job, handle) = task_pair(task, Some((queue.clone(), index)));
        handles.push(Some(handle));
        if let Err(err) = service.execute(job) {
            cancel_all(&handles);
            return Err(err.into());
        }
    }

    let mut last_failure = None;
    for _ in 0..handles.len() {
        let Some(index) = queue.pop(deadline) else {
            cancel_all(&handles);
            return Err(ExecutorError::timeout(timeout.unwrap_or_default()).into());
        };
        let Some(handle) = handles.get_mut(index).and_then(Option::take) else {
            continue;
        };
        match handle.wait() {
            Ok(value) => {
                cancel_all(&handles);
                return Ok(value);
            }
            Err(failure) => last_failure = Some(failure),
        }
    }

    Err(InvokeError::AllFailed(
        last_failure.unwrap_or(TaskError::Cancelled),
    ))
}

/// Submits every task and waits for all of them.
pub(crate) fn invoke_all<S, F, T, E>(
    service: &S,
    tasks: Vec<F>,
    timeout: Option<Duration>,
) -> Result<Vec<TaskHandle<T, E>>, ExecutorError>
where
    S: Executor + ?Sized,
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let (job, handle) = task_pair(task, None);
        handles.push(handle);
        if let Err(err) = service.execute(job) {
            for handle in &handles {
                handle.cancel();
            }
            return Err(err);
        }
    }

    for handle in &handles {
        if !handle.block_until(deadline) {
            for pending in &handles {
                pending.cancel();
            }
            break;
        }
    }

    Ok(handles)
}
