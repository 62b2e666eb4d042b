//! Full execution-service decorator.

use super::{Executor, ExecutorService, TaskHandle};
use crate::context::ContextCoordinator;
use crate::errors::{ExecutorError, InvokeError};
use crate::task::{ContextPreservedCallable, ContextPreservedRunnable, Job};
use crate::utils::validation::require_non_empty;
use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

/// Wraps an [`ExecutorService`] so every submission shape runs under the
/// submitter's context at submission time.
///
/// Single submissions read a fresh snapshot per call. Batches read once and
/// apply that snapshot to every task, then hand the whole batch to the inner
/// service so its own timeout and cancellation rules stay in force.
/// Lifecycle calls are forwarded untouched.
pub struct DynamicContextExecutorService<S, C> {
    inner: S,
    coordinator: C,
}

impl<S: ExecutorService, C: ContextCoordinator + Clone + 'static> DynamicContextExecutorService<S, C> {
    /// Decorates `service`. Nothing is read until the first submission.
    #[must_use]
    pub fn wrap(service: S, coordinator: C) -> Self {
        Self {
            inner: service,
            coordinator,
        }
    }

    /// Returns the decorated service.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn capture<F>(&self, task: F) -> ContextPreservedCallable<C, F> {
        ContextPreservedCallable::wrap_with(task, self.coordinator.clone(), self.coordinator.read())
    }

    fn capture_batch<F, T, E>(&self, tasks: Vec<F>) -> Vec<impl FnOnce() -> Result<T, E> + Send + 'static>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let context = self.coordinator.read();
        tasks
            .into_iter()
            .map(|task| {
                let task =
                    ContextPreservedCallable::wrap_with(task, self.coordinator.clone(), context.clone());
                move || task.call()
            })
            .collect()
    }
}

impl<S: ExecutorService, C: ContextCoordinator + Clone + 'static> Executor
    for DynamicContextExecutorService<S, C>
{
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        let context = self.coordinator.read();
        self.inner.execute(
            ContextPreservedRunnable::wrap_with(job, self.coordinator.clone(), context).into_job(),
        )
    }
}

impl<S: ExecutorService, C: ContextCoordinator + Clone + 'static> ExecutorService
    for DynamicContextExecutorService<S, C>
{
    fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }

    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        self.inner.await_termination(timeout)
    }

    fn submit<F, T, E>(&self, task: F) -> Result<TaskHandle<T, E>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let task = self.capture(task);
        self.inner.submit(move || task.call())
    }

    fn submit_runnable<F>(&self, action: F) -> Result<TaskHandle<(), Infallible>, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let action = self.capture(action);
        self.inner.submit_runnable(move || action.call())
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
        let action = self.capture(action);
        self.inner.submit_with_result(move || action.call(), result)
    }

    fn invoke_any<F, T, E>(&self, tasks: Vec<F>) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        require_non_empty("tasks", &tasks).map_err(ExecutorError::from)?;
        self.inner.invoke_any(self.capture_batch(tasks))
    }

    fn invoke_any_timeout<F, T, E>(&self, tasks: Vec<F>, timeout: Duration) -> Result<T, InvokeError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        require_non_empty("tasks", &tasks).map_err(ExecutorError::from)?;
        self.inner.invoke_any_timeout(self.capture_batch(tasks), timeout)
    }

    fn invoke_all<F, T, E>(&self, tasks: Vec<F>) -> Result<Vec<TaskHandle<T, E>>, ExecutorError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.inner.invoke_all(self.capture_batch(tasks))
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
        self.inner.invoke_all_timeout(self.capture_batch(tasks), timeout)
    }
}

impl<S: fmt::Debug, C> fmt::Debug for DynamicContextExecutorService<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContextExecutorService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{context_map, mdc, ContextMap, MdcCoordinator};
    use crate::errors::TaskError;
    use crate::testing::{InlineExecutor, RecordingCoordinator};
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    mock! {
        pub Coordinator {}

        impl ContextCoordinator for Coordinator {
            type Snapshot = ContextMap;

            fn read(&self) -> Option<ContextMap>;
            fn install(&self, context: Option<ContextMap>);
        }
    }

    fn decorated() -> DynamicContextExecutorService<InlineExecutor, MdcCoordinator> {
        DynamicContextExecutorService::wrap(InlineExecutor::new(), MdcCoordinator)
    }

    #[test]
    fn test_submit_runs_under_submitter_context() {
        let service = decorated();
        mdc::set_context_map(Some(context_map([("k", "v1")])));

        let seen = service.submit(|| Ok::<_, String>(mdc::get("k"))).unwrap().wait();

        assert_eq!(seen, Ok(Some("v1".to_string())));
        mdc::clear();
    }

    #[test]
    fn test_submit_with_result_returns_given_value() {
        let service = decorated();
        mdc::set_context_map(Some(context_map([("k", "v1")])));
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&seen);

        let handle = service
            .submit_with_result(move || *slot.lock() = mdc::get("k"), "result")
            .unwrap();

        assert_eq!(handle.wait(), Ok("result"));
        assert_eq!(seen.lock().as_deref(), Some("v1"));
        mdc::clear();
    }

    #[test]
    fn test_submit_runnable_completes_with_unit() {
        let service = decorated();
        assert_eq!(service.submit_runnable(|| {}).unwrap().wait(), Ok(()));
    }

    #[test]
    fn test_task_failure_passes_through() {
        let service = decorated();
        let handle = service.submit(|| Err::<u8, _>("bad".to_string())).unwrap();
        assert_eq!(handle.wait(), Err(TaskError::Failed("bad".to_string())));
    }

    #[test]
    fn test_each_single_submission_reads_once() {
        let coordinator = RecordingCoordinator::new();
        let service = DynamicContextExecutorService::wrap(InlineExecutor::new(), coordinator.clone());

        service.submit(|| Ok::<_, String>(())).unwrap().wait().unwrap();
        service.submit_runnable(|| {}).unwrap().wait().unwrap();
        service.execute(Box::new(|| {})).unwrap();

        // three captures plus one read of the prior per run
        assert_eq!(coordinator.reads(), 6);
    }

    #[test]
    fn test_batch_reads_once_and_shares_snapshot() {
        let coordinator = RecordingCoordinator::new();
        let service = DynamicContextExecutorService::wrap(InlineExecutor::new(), coordinator.clone());
        mdc::set_context_map(Some(context_map([("k", "batch")])));

        let tasks = vec![|| Ok::<_, String>(mdc::copy_of_context_map()); 3];
        let handles = service.invoke_all(tasks).unwrap();
        mdc::clear();

        // one capture plus one prior read per task
        assert_eq!(coordinator.reads(), 1 + 3);
        for handle in handles {
            assert_eq!(handle.wait(), Ok(Some(context_map([("k", "batch")]))));
        }
    }

    #[test]
    fn test_batch_goes_to_inner_batch_operation() {
        let service = decorated();

        let tasks: Vec<fn() -> Result<u8, String>> = vec![|| Ok(1), || Ok(2)];
        service.invoke_all(tasks).unwrap();
        service
            .invoke_any_timeout(vec![|| Ok::<_, String>(1)], Duration::from_secs(1))
            .unwrap();

        assert_eq!(service.inner().batch_calls(), 2);
    }

    #[test]
    fn test_invoke_any_returns_success() {
        let service = decorated();
        mdc::set_context_map(Some(context_map([("k", "any")])));

        let tasks: Vec<fn() -> Result<Option<String>, String>> =
            vec![|| Ok(mdc::get("k")), || Err("no".to_string())];
        let value = service.invoke_any(tasks).unwrap();

        assert_eq!(value.as_deref(), Some("any"));
        mdc::clear();
    }

    #[test]
    fn test_empty_invoke_any_fails_without_read() {
        let mut coordinator = MockCoordinator::new();
        coordinator.expect_read().never();
        coordinator.expect_install().never();
        let service = DynamicContextExecutorService::wrap(InlineExecutor::new(), Arc::new(coordinator));

        let tasks: Vec<fn() -> Result<u8, String>> = Vec::new();
        let err = service.invoke_any(tasks).unwrap_err();

        assert!(matches!(
            err,
            InvokeError::Executor(ExecutorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_timeout_is_handed_to_engine() {
        let service = decorated();
        let handles = service
            .invoke_all_timeout(vec![|| Ok::<_, String>(1)], Duration::ZERO)
            .unwrap();
        assert_eq!(handles.len(), 1);
    }

    #[test]
    fn test_max_duration_timeouts_through_decorator() {
        let service = decorated();
        mdc::set_context_map(Some(context_map([("k", "forever")])));

        let any = service
            .invoke_any_timeout(vec![|| Ok::<_, String>(mdc::get("k"))], Duration::MAX)
            .unwrap();
        let all = service
            .invoke_all_timeout(vec![|| Ok::<_, String>(mdc::get("k"))], Duration::MAX)
            .unwrap();
        mdc::clear();

        assert_eq!(any.as_deref(), Some("forever"));
        for handle in all {
            assert_eq!(handle.wait_timeout(Duration::MAX).unwrap(), Ok(Some("forever".to_string())));
        }
    }

    #[test]
    fn test_lifecycle_forwards() {
        let service = decorated();
        assert!(!service.is_shutdown());

        service.shutdown();

        assert!(service.inner().is_shutdown());
        assert!(service.is_terminated());
        assert!(service.await_termination(Duration::ZERO));
        assert!(matches!(
            service.execute(Box::new(|| {})),
            Err(ExecutorError::Rejected { .. })
        ));
    }

    #[test]
    fn test_mock_coordinator_sees_read_then_install_restore() {
        let mut coordinator = MockCoordinator::new();
        let mut sequence = mockall::Sequence::new();
        coordinator
            .expect_read()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Some(context_map([("k", "captured")])));
        coordinator
            .expect_read()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| None);
        coordinator
            .expect_install()
            .withf(|context| context.as_ref() == Some(&context_map([("k", "captured")])))
            .times(1)
            .in_sequence(&mut sequence)
            .return_const(());
        coordinator
            .expect_install()
            .withf(Option::is_none)
            .times(1)
            .in_sequence(&mut sequence)
            .return_const(());
        let service = DynamicContextExecutorService::wrap(InlineExecutor::new(), Arc::new(coordinator));

        service.submit(|| Ok::<_, String>(())).unwrap().wait().unwrap();
    }
}
