//! Precondition checks shared by decorators and engines.
//!
//! Ownership already rules out absent tasks and engines, so what remains are
//! the checks on values that are well-typed but still unusable.

use crate::errors::InvalidArgumentError;

/// Requires a collection to hold at least one element.
pub fn require_non_empty<T>(argument: &'static str, items: &[T]) -> Result<(), InvalidArgumentError> {
    if items.is_empty() {
        return Err(InvalidArgumentError::new(argument, "must not be empty"));
    }
    Ok(())
}

/// Requires a string to hold at least one character. Whitespace counts.
pub fn require_non_empty_str(argument: &'static str, value: &str) -> Result<(), InvalidArgumentError> {
    if value.is_empty() {
        return Err(InvalidArgumentError::new(argument, "must not be empty"));
    }
    Ok(())
}

/// Requires a count to be at least one.
pub fn require_positive(argument: &'static str, value: usize) -> Result<(), InvalidArgumentError> {
    if value == 0 {
        return Err(InvalidArgumentError::new(argument, "must be greater than zero"));
    }
    Ok(())
}
