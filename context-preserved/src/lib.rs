//! # context-preserved
//!
//! Carries a thread-affined ambient context, such as the mapped diagnostic
//! context (MDC) of a logging setup, across executor and thread-pool
//! boundaries.
//!
//! Thread pools reuse threads, so context set on one thread is invisible to
//! the task it hands off, and context left behind by one task leaks into the
//! next. This crate provides:
//!
//! - **Coordinators**: a two-operation capability (`read`, `install`) over
//!   any thread-affined store, with [`context::MdcCoordinator`] built in
//! - **Task decorators**: callables, runnables, and futures that install a
//!   captured snapshot around their body and restore the worker's own context
//!   afterwards, even on panic
//! - **Executor decorators**: Dynamic (capture per submission) and Fixed
//!   (capture once) wrappers for plain task sinks, and a Dynamic wrapper for
//!   full execution services including batch operations
//! - **An execution engine**: a tokio blocking-pool [`executor::ExecutorService`]
//! - **Logging**: a `tracing` formatter that prints the MDC on every event
//!
//! ## Quick Start
//!
//! ```rust
//! use context_preserved::prelude::*;
//!
//! let pool = mdc_preserved::dynamic_executor(
//!     TokioExecutorService::new(&ExecutorConfig::default()).unwrap(),
//! );
//!
//! mdc::put("request_id", "r-42").unwrap();
//! let (tx, rx) = std::sync::mpsc::channel();
//! pool.execute(Box::new(move || tx.send(mdc::get("request_id")).unwrap()))
//!     .unwrap();
//!
//! assert_eq!(rx.recv().unwrap().as_deref(), Some("r-42"));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod errors;
pub mod executor;
pub mod mdc_preserved;
pub mod observability;
pub mod task;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{
        context_map, mdc, ContextCoordinator, ContextMap, ContextScope, MdcCoordinator,
    };
    pub use crate::errors::{
        ContextPreservedError, ExecutorError, InvalidArgumentError, InvokeError, TaskError,
    };
    pub use crate::executor::{
        DynamicContextExecutor, DynamicContextExecutorService, Executor, ExecutorConfig,
        ExecutorService, FixedContextExecutor, TaskHandle, TokioExecutorService,
    };
    pub use crate::mdc_preserved;
    pub use crate::observability::{init_logging, LogFormat, LoggingConfig};
    pub use crate::task::{
        ContextPreservedCallable, ContextPreservedFuture, ContextPreservedRunnable,
        PreserveContextExt,
    };
}
