//! Mapped diagnostic context: a per-thread map of logging correlation fields.
//!
//! Every thread owns its own map. Nothing here crosses threads on its own;
//! that is what the decorators in [`crate::task`] and [`crate::executor`]
//! are for, reaching this store through [`MdcCoordinator`].

use super::{ContextCoordinator, ContextMap};
use crate::errors::InvalidArgumentError;
use crate::utils::validation::require_non_empty_str;
use std::cell::RefCell;

thread_local! {
    static MDC: RefCell<Option<ContextMap>> = const { RefCell::new(None) };
}

/// Puts a key/value pair into the current thread's context.
///
/// # Errors
///
/// Returns `InvalidArgumentError` if the key is empty.
pub fn put(key: impl Into<String>, value: impl Into<String>) -> Result<(), InvalidArgumentError> {
    let key = key.into();
    require_non_empty_str("key", &key)?;
    MDC.with(|cell| {
        cell.borrow_mut()
            .get_or_insert_with(ContextMap::new)
            .insert(key, value.into());
    });
    Ok(())
}

/// Returns the value stored under `key` on the current thread.
#[must_use]
pub fn get(key: &str) -> Option<String> {
    MDC.with(|cell| cell.borrow().as_ref().and_then(|map| map.get(key).cloned()))
}

/// Removes `key` from the current thread's context, returning its value.
pub fn remove(key: &str) -> Option<String> {
    MDC.with(|cell| cell.borrow_mut().as_mut().and_then(|map| map.remove(key)))
}

/// Removes every entry from the current thread's context.
pub fn clear() {
    set_context_map(None);
}

/// Returns an independent copy of the current thread's context.
///
/// `None` means no context has been installed on this thread (or it was
/// cleared). Mutating the returned map never affects the thread's context.
#[must_use]
pub fn copy_of_context_map() -> Option<ContextMap> {
    MDC.with(|cell| cell.borrow().clone())
}

/// Replaces the current thread's context wholesale. `None` clears it.
pub fn set_context_map(context: Option<ContextMap>) {
    MDC.with(|cell| *cell.borrow_mut() = context);
}

/// Borrows the current thread's context without copying it.
pub(crate) fn with_current<R>(f: impl FnOnce(Option<&ContextMap>) -> R) -> R {
    MDC.with(|cell| f(cell.borrow().as_ref()))
}

/// Puts a key/value pair and returns a guard that undoes it on drop.
///
/// On drop the key gets back the value it had before, or is removed if it had
/// none.
///
/// # Errors
///
/// Returns `InvalidArgumentError` if the key is empty.
pub fn put_scoped(
    key: impl Into<String>,
    value: impl Into<String>,
) -> Result<MdcKeyGuard, InvalidArgumentError> {
    let key = key.into();
    require_non_empty_str("key", &key)?;
    let previous = get(&key);
    put(key.clone(), value)?;
    Ok(MdcKeyGuard { key, previous })
}

/// Returns the value under `key`, generating a UUID v4 for it first if the
/// key is absent.
///
/// # Errors
///
/// Returns `InvalidArgumentError` if the key is empty.
pub fn ensure_correlation_id(key: &str) -> Result<String, InvalidArgumentError> {
    if let Some(existing) = get(key) {
        return Ok(existing);
    }
    let id = uuid::Uuid::new_v4().to_string();
    put(key, id.clone())?;
    Ok(id)
}

/// Restores a single context key when dropped. Created by [`put_scoped`].
#[derive(Debug)]
#[must_use = "the key is restored as soon as the guard is dropped"]
pub struct MdcKeyGuard {
    key: String,
    previous: Option<String>,
}

impl MdcKeyGuard {
    /// Returns the guarded key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for MdcKeyGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The thread-local may already be gone during thread teardown.
        let _ = MDC.try_with(|cell| {
            let mut slot = cell.borrow_mut();
            match previous {
                Some(value) => {
                    slot.get_or_insert_with(ContextMap::new)
                        .insert(std::mem::take(&mut self.key), value);
                }
                None => {
                    if let Some(map) = slot.as_mut() {
                        map.remove(&self.key);
                    }
                }
            }
        });
    }
}

/// Coordinator over the mapped diagnostic context of this module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MdcCoordinator;

impl ContextCoordinator for MdcCoordinator {
    type Snapshot = ContextMap;

    fn read(&self) -> Option<ContextMap> {
        copy_of_context_map()
    }

    fn install(&self, context: Option<ContextMap>) {
        set_context_map(context);
    }
}
