//! Single-shot units of work that carry a context snapshot with them.
//!
//! Each decorator stores one resolved snapshot (read at wrap time, or given
//! explicitly) and installs it around the inner body on whichever thread
//! eventually runs it.

mod callable;
mod future;
mod runnable;

pub use callable::ContextPreservedCallable;
pub use future::{ContextPreservedFuture, PreserveContextExt};
pub use runnable::ContextPreservedRunnable;

/// A boxed fire-and-forget unit of work, the currency of [`crate::executor::Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;
