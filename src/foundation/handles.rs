//! Reference-counted smart pointers
//!
//! This module provides `Handle<T>`, the shallow-copyable shared-ownership
//! wrapper behind [`crate::BicubicSurface`]. A surface engine is built once
//! and then referenced by any number of handles; the engine is destroyed
//! exactly when the last handle drops.
//!
//! # Overview
//!
//! The `Handle<T>` type provides:
//! - **Reference counting**: all clones share one allocation via `Arc<T>`
//! - **Thread-safety**: the count is updated atomically, so handle copies
//!   and drops may race across threads
//! - **Null handling**: a default-constructed handle references nothing and
//!   reports `is_null()`
//! - **Transparent access**: implements `Deref` for seamless value access
//!
//! # Example
//!
//! ```rust,ignore
//! use surfit::foundation::Handle;
//!
//! let h1 = Handle::new(42);
//! let h2 = h1.clone(); // cheap, increments the shared count
//! assert_eq!(h1.strong_count(), 2);
//!
//! let empty: Handle<i32> = Handle::null();
//! assert!(empty.is_null());
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A reference-counted smart pointer with null semantics.
///
/// All clones of a `Handle<T>` share the same underlying allocation, which
/// is freed when the last clone is dropped. The payload is never mutated
/// through a handle, so shared access from many threads needs no locking.
pub struct Handle<T: ?Sized> {
    // Option<Arc<T>> allows null handles
    inner: Option<Arc<T>>,
}

// Manual impl: cloning copies the Arc, so the payload type never needs to
// be Clone itself.
impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized> Handle<T> {
    /// Returns `true` if this handle references nothing.
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns a reference to the contained value, or `None` if null.
    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref().map(|arc| arc.as_ref())
    }

    /// Returns the number of handles sharing the contained value, or 0 for
    /// a null handle.
    pub fn strong_count(&self) -> usize {
        self.inner
            .as_ref()
            .map(|arc| Arc::strong_count(arc))
            .unwrap_or(0)
    }
}

impl<T> Handle<T> {
    /// Creates a new handle owning the given value.
    pub fn new(value: T) -> Self {
        Handle {
            inner: Some(Arc::new(value)),
        }
    }

    /// Creates a null handle referencing nothing.
    pub fn null() -> Self {
        Handle { inner: None }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    /// Dereferences the handle to access the contained value.
    ///
    /// # Panics
    ///
    /// Panics if the handle is null. Use `get()` for fallible access.
    fn deref(&self) -> &Self::Target {
        self.inner
            .as_ref()
            .expect("Cannot dereference a null Handle")
            .as_ref()
    }
}

impl<T> Default for Handle<T> {
    /// Returns a null handle.
    fn default() -> Self {
        Handle::null()
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(arc) => f.debug_tuple("Handle").field(arc).finish(),
            None => f.write_str("Handle(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_creation() {
        let h = Handle::new(42);
        assert!(!h.is_null());
        assert_eq!(h.get(), Some(&42));
    }

    #[test]
    fn test_handle_null() {
        let h: Handle<i32> = Handle::null();
        assert!(h.is_null());
        assert_eq!(h.get(), None);
        assert_eq!(h.strong_count(), 0);
    }

    #[test]
    fn test_handle_clone_shares_allocation() {
        let h1 = Handle::new(vec![1, 2, 3]);
        assert_eq!(h1.strong_count(), 1);

        let h2 = h1.clone();
        assert_eq!(h1.strong_count(), 2);
        assert_eq!(h1.get(), h2.get());

        drop(h2);
        assert_eq!(h1.strong_count(), 1);
    }

    #[test]
    fn test_handle_clone_of_non_clone_payload() {
        // The payload type itself need not be Clone; only the Arc is
        // copied. Atomics are the practical case: shared engine counters.
        use std::sync::atomic::{AtomicU64, Ordering};

        struct Counter(AtomicU64);

        let h1 = Handle::new(Counter(AtomicU64::new(7)));
        let h2 = h1.clone();
        h2.get().unwrap().0.fetch_add(1, Ordering::Relaxed);
        assert_eq!(h1.get().unwrap().0.load(Ordering::Relaxed), 8);
        assert_eq!(h1.strong_count(), 2);
    }

    #[test]
    fn test_handle_deref() {
        let h = Handle::new(42);
        assert_eq!(*h, 42);
    }

    #[test]
    #[should_panic(expected = "Cannot dereference a null Handle")]
    fn test_handle_deref_null_panics() {
        let h: Handle<i32> = Handle::null();
        let _ = *h;
    }

    #[test]
    fn test_handle_default_is_null() {
        let h: Handle<i32> = Default::default();
        assert!(h.is_null());
    }

    #[test]
    fn test_handle_multithread_safety() {
        use std::thread;

        let h = Handle::new(42);

        let joins: Vec<_> = (0..10)
            .map(|_| {
                let handle = h.clone();
                thread::spawn(move || handle.get().copied())
            })
            .collect();

        for join in joins {
            assert_eq!(join.join().unwrap(), Some(42));
        }
        assert_eq!(h.strong_count(), 1);
    }
}
