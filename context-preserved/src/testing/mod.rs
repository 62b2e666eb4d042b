//! Testing utilities for context-preserving decorators.
//!
//! This module provides:
//! - A counting coordinator over the MDC
//! - Executors that run jobs inline or on demand on a fresh thread
//! - A probe that records the context a task observed

mod mocks;

pub use mocks::{ContextProbe, DeferredExecutor, InlineExecutor, RecordingCoordinator};
