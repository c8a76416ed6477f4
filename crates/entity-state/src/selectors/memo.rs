//! Single-entry memo cells keyed by slice identity.
//!
//! A cell remembers the last slice it computed from through a `Weak`, so
//! it never keeps an old slice alive and never bumps the strong count
//! (which would force the reducer's next write to clone the slice). While
//! the `Weak` lives, its allocation cannot be reused, so pointer equality
//! is a sound identity test.
//!
//! Uses `parking_lot::Mutex`: no poisoning, and the lock is only held for
//! the duration of one computation.

use crate::domain::EntitySlice;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Memoized value derived from one slice.
#[derive(Debug)]
pub struct Memo<T> {
    cell: Mutex<Option<(Weak<EntitySlice>, T)>>,
    computations: AtomicU64,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            cell: Mutex::new(None),
            computations: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `slice`, computing it if the slice changed.
    pub fn get_or_compute<F>(&self, slice: &Arc<EntitySlice>, compute: F) -> T
    where
        F: FnOnce(&EntitySlice) -> T,
    {
        let mut cell = self.cell.lock();
        if let Some((source, value)) = cell.as_ref() {
            if std::ptr::eq(source.as_ptr(), Arc::as_ptr(slice)) {
                return value.clone();
            }
        }
        let value = compute(slice);
        self.computations.fetch_add(1, Ordering::Relaxed);
        *cell = Some((Arc::downgrade(slice), value.clone()));
        value
    }

    /// Number of times the value was (re)computed.
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        *self.cell.lock() = None;
    }
}

/// A family of memo cells, one per key (e.g. comparer name).
#[derive(Debug)]
pub struct MemoMap<T> {
    cells: Mutex<HashMap<String, Arc<Memo<T>>>>,
}

impl<T> Default for MemoMap<T> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> MemoMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `key`, created on first use.
    pub fn cell(&self, key: &str) -> Arc<Memo<T>> {
        self.cells
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}
