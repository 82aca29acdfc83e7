//! Per-thread record of the types currently being resolved.
//!
//! Each resolution pushes its key for the duration of the build. Seeing a
//! key that is already on the stack for the same resolver means the type
//! depends on itself.

use std::cell::RefCell;

use crate::error::{CacodiError, CircularDependencyError, Result};
use crate::key::TypeKey;

thread_local! {
    static IN_FLIGHT: RefCell<Vec<(usize, TypeKey)>> = const { RefCell::new(Vec::new()) };
}

/// RAII marker for one in-flight resolution. Popped on drop, unwinding
/// included.
pub(crate) struct ResolutionGuard {
    resolver: usize,
    required_by: Option<TypeKey>,
}

impl ResolutionGuard {
    /// Marks `key` as being resolved by resolver `resolver`.
    ///
    /// # Errors
    /// [`CacodiError::CircularDependency`] if `detect_cycles` is set and
    /// `key` is already in flight for the same resolver.
    pub(crate) fn enter(resolver: usize, key: &TypeKey, detect_cycles: bool) -> Result<Self> {
        IN_FLIGHT.with(|stack| {
            let mut stack = stack.borrow_mut();

            if detect_cycles {
                let start = stack
                    .iter()
                    .position(|(owner, pending)| *owner == resolver && pending == key);

                if let Some(start) = start {
                    let mut chain: Vec<TypeKey> = stack[start..]
                        .iter()
                        .filter(|(owner, _)| *owner == resolver)
                        .map(|(_, pending)| pending.clone())
                        .collect();
                    chain.push(key.clone());

                    return Err(CacodiError::CircularDependency(CircularDependencyError {
                        chain,
                    }));
                }
            }

            let required_by = stack
                .iter()
                .rev()
                .find(|(owner, _)| *owner == resolver)
                .map(|(_, pending)| pending.clone());

            stack.push((resolver, key.clone()));
            Ok(Self {
                resolver,
                required_by,
            })
        })
    }

    /// The type whose resolution led to this one.
    pub(crate) fn required_by(&self) -> Option<&TypeKey> {
        self.required_by.as_ref()
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(index) = stack.iter().rposition(|(owner, _)| *owner == self.resolver) {
                stack.remove(index);
            }
        });
    }
}
