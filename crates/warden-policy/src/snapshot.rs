//! Atomically swappable, immutable snapshots.
//!
//! Readers take an `Arc` to the current value and work on it without holding
//! any lock; the host publishes a complete replacement with `replace`. A
//! reader therefore sees either the old value or the new one in full, never a
//! partially updated group or user record.

use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// The value currently published.
    pub fn load(&self) -> Arc<T> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Publish `value`, returning the snapshot it replaced.
    pub fn replace(&self, value: T) -> Arc<T> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(value))
    }
}

impl<T: Clone> Snapshot<T> {
    /// Copy the current value, apply `edit`, and publish the result.
    ///
    /// Edits are serialized against each other; concurrent readers keep
    /// seeing the previous snapshot until the new one is published.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = T::clone(&guard);
        edit(&mut next);
        *guard = Arc::new(next);
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
