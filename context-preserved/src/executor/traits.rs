//! Submission-point abstractions.

use super::batch;
use super::handle::{self, TaskHandle};
use crate::errors::{ExecutorError, InvokeError};
use crate::task::Job;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// A sink that accepts fire-and-forget jobs and runs them somewhere.
pub trait Executor: Send + Sync {
    /// Hands `job` to the executor.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::Rejected` if the executor will not run it.
    fn execute(&self, job: Job) -> Result<(), ExecutorError>;
}

impl<X: Executor + ?Sized> Executor for Arc<X> {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        (**self).execute(job)
    }
}

impl<X: Executor + ?Sized> Executor for &X {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        (**self).execute(job)
    }
}

/// A task-execution service exposing every submission shape.
///
/// Engines only need to provide [`Executor::execute`] and the lifecycle
/// methods; every submission shape has a default built on `execute`.
/// Decorators override all of them so the inner engine's own batch semantics
/// are kept.
pub trait ExecutorService: Executor {
    /// Stops accepting new submissions. Already accepted jobs still run.
    fn shutdown(&self);

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    fn is_shutdown(&self) -> bool;

    /// Returns true once shut down and every accepted job has finished.
    fn is_terminated(&self) -> bool;

    /// Blocks until terminated or until `timeout` elapses. Returns whether
    /// the service terminated.
    fn await_termination(&self, timeout: Duration) -> bool;

    /// Submits a result-producing task.
    fn submit<F, T, E>(&self, task: F) -> Result<TaskHandle<T, E>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (job, handle) = handle::task_pair(task, None);
        self.execute(job)?;
        Ok(handle)
    }

    /// Submits an action; the handle completes with `()`.
    fn submit_runnable<F>(&self, action: F) -> Result<TaskHandle<(), Infallible>, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(move || {
            action();
            Ok::<(), Infallible>(())
        })
    }

    /// Submits an action; the handle completes with `result`.
    fn submit_with_result<F, T>(
        &self,
        action: F,
        result: T,
    ) -> Result<TaskHandle<T, Infallible>, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
        T: Send + 'static,
    {
        self.submit(move || {
            action();
            Ok::<T, Infallible>(result)
        })
    }

    /// Runs `tasks` and returns the result of the first one to succeed.
    /// Tasks still pending at that point are cancelled.
    fn invoke_any<F, T, E>(&self, tasks: Vec<F>) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        batch::invoke_any(self, tasks, None)
    }

    /// Like [`invoke_any`](Self::invoke_any), failing with
    /// `ExecutorError::Timeout` if nothing succeeds within `timeout`.
    fn invoke_any_timeout<F, T, E>(&self, tasks: Vec<F>, timeout: Duration) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        batch::invoke_any(self, tasks, Some(timeout))
    }

    /// Runs `tasks` and waits until every one has completed.
    fn invoke_all<F, T, E>(&self, tasks: Vec<F>) -> Result<Vec<TaskHandle<T, E>>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        batch::invoke_all(self, tasks, None)
    }

    /// Like [`invoke_all`](Self::invoke_all); tasks unfinished when `timeout`
    /// elapses are cancelled and their handles report
    /// [`TaskError::Cancelled`](crate::errors::TaskError::Cancelled) unless
    /// they were already running.
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
        batch::invoke_all(self, tasks, Some(timeout))
    }
}

impl<S: ExecutorService + ?Sized> ExecutorService for Arc<S> {
    fn shutdown(&self) {
        (**self).shutdown();
    }

    fn is_shutdown(&self) -> bool {
        (**self).is_shutdown()
    }

    fn is_terminated(&self) -> bool {
        (**self).is_terminated()
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        (**self).await_termination(timeout)
    }

    fn submit<F, T, E>(&self, task: F) -> Result<TaskHandle<T, E>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        (**self).submit(task)
    }

    fn submit_runnable<F>(&self, action: F) -> Result<TaskHandle<(), Infallible>, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        (**self).submit_runnable(action)
    }

    fn submit_with_result<F, T>(
        &self,
        action: F,
        result: T,
    ) -> Result<TaskHandle<T, Infallible>, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
        T: Send + 'static,
    {
        (**self).submit_with_result(action, result)
    }

    fn invoke_any<F, T, E>(&self, tasks: Vec<F>) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        (**self).invoke_any(tasks)
    }

    fn invoke_any_timeout<F, T, E>(&self, tasks: Vec<F>, timeout: Duration) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        (**self).invoke_any_timeout(tasks, timeout)
    }

    fn invoke_all<F, T, E>(&self, tasks: Vec<F>) -> Result<Vec<TaskHandle<T, E>>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        (**self).invoke_all(tasks)
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
        (**self).invoke_all_timeout(tasks, timeout)
    }
}
