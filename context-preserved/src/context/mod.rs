//! Ambient context access.
//!
//! This module provides:
//! - The [`ContextCoordinator`] capability through which decorators read and
//!   install context
//! - Snapshot values and the key/value [`ContextMap`]
//! - Scoped installation with guaranteed restoration
//! - The thread-local mapped diagnostic context ([`mdc`])

mod coordinator;
pub mod mdc;
mod scope;
mod snapshot;

pub use coordinator::{ContextCoordinator, FnCoordinator};
pub use mdc::{MdcCoordinator, MdcKeyGuard};
pub use scope::{run_in_context, ContextScope};
pub use snapshot::{context_map, ContextMap, DisplayContext, Snapshot};
