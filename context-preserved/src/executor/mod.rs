//! Task sinks, execution services, and their context-preserving decorators.
//!
//! This module provides:
//! - The [`Executor`] and [`ExecutorService`] abstractions
//! - [`DynamicContextExecutor`] and [`FixedContextExecutor`] over plain sinks
//! - [`DynamicContextExecutorService`] over full services
//! - [`TokioExecutorService`], a thread-pool engine, and its [`TaskHandle`]s

pub(crate) mod batch;
mod config;
mod dynamic;
mod fixed;
mod handle;
mod pool;
mod service;
mod traits;

pub use config::ExecutorConfig;
pub use dynamic::DynamicContextExecutor;
pub use fixed::FixedContextExecutor;
pub use handle::TaskHandle;
pub use pool::TokioExecutorService;
pub use service::DynamicContextExecutorService;
pub use traits::{Executor, ExecutorService};
