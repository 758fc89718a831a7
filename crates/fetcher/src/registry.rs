//! Thread-safe registry of in-flight requests, keyed by [`CancellationKey`].
//!
//! Every fetcher operation registers a handle when it starts and releases it on
//! its single completion path. Completions arrive on arbitrary runtime threads,
//! so the map sits behind one mutex. The lock only covers map mutation: handle
//! cancellation runs after the lock is released, and no lock is ever held
//! across a transport call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::CancellationKey;

/// A cancellable unit of in-flight work.
///
/// The registry holds a shared reference that is only used to request
/// cancellation; the work itself is owned elsewhere. Cancelling work that has
/// already finished must be harmless.
pub trait InFlight: Send + Sync {
    fn cancel(&self);
}

impl InFlight for CancellationToken {
    fn cancel(&self) {
        CancellationToken::cancel(self);
    }
}

/// Maps each [`CancellationKey`] to the handle of its in-flight operation.
///
/// A key is present exactly while its operation is running.
#[derive(Default)]
pub struct CancellationRegistry {
    handles: Mutex<HashMap<CancellationKey, Arc<dyn InFlight>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The map is consistent after every statement, so a panic elsewhere while
    // the lock was held leaves nothing to repair.
    fn lock(&self) -> MutexGuard<'_, HashMap<CancellationKey, Arc<dyn InFlight>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handle` under `key`. Does nothing when `handle` is `None`.
    ///
    /// A different handle already registered under `key` is cancelled, so an
    /// operation never keeps running once nothing can reach it.
    pub fn track(&self, key: CancellationKey, handle: Option<Arc<dyn InFlight>>) {
        let Some(handle) = handle else {
            return;
        };
        trace!(key = %key, "tracking request");
        let displaced = self.lock().insert(key.clone(), Arc::clone(&handle));
        if let Some(previous) = displaced.filter(|previous| !same_handle(previous, &handle)) {
            previous.cancel();
            debug!(key = %key, "cancelled request superseded under the same key");
        }
    }

    /// Removes the entry for `key`, if any.
    pub fn untrack(&self, key: &CancellationKey) {
        if self.lock().remove(key).is_some() {
            trace!(key = %key, "untracked request");
        }
    }

    /// Removes the entry for `key` only if it still refers to `handle`.
    ///
    /// Completion paths use this so that finishing late never drops a newer
    /// registration made under the same key.
    pub(crate) fn release(&self, key: &CancellationKey, handle: &Arc<dyn InFlight>) {
        let mut handles = self.lock();
        let is_same = handles
            .get(key)
            .is_some_and(|current| same_handle(current, handle));
        if is_same {
            handles.remove(key);
            trace!(key = %key, "released request");
        }
    }

    /// Cancels the operation registered under `key` and forgets it.
    ///
    /// Returns `false` (and does nothing) when the key is unknown, which is the
    /// normal outcome when the operation has already completed.
    pub fn cancel(&self, key: &CancellationKey) -> bool {
        let handle = self.lock().remove(key);
        match handle {
            Some(handle) => {
                handle.cancel();
                debug!(key = %key, "cancelled request");
                true
            }
            None => {
                trace!(key = %key, "cancel ignored: no request in flight");
                false
            }
        }
    }

    /// Cancels every registered operation and empties the registry.
    ///
    /// The map is snapshotted and cleared atomically. Operations registered
    /// after the snapshot are left running. Returns the number cancelled.
    pub fn cancel_all(&self) -> usize {
        let snapshot = std::mem::take(&mut *self.lock());
        let count = snapshot.len();
        for handle in snapshot.into_values() {
            handle.cancel();
        }
        if count > 0 {
            debug!(count, "cancelled all requests");
        }
        count
    }

    /// Returns `true` if an operation is registered under `key`.
    pub fn contains(&self, key: &CancellationKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of operations currently registered.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("in_flight", &self.len())
            .finish()
    }
}

fn same_handle(a: &Arc<dyn InFlight>, b: &Arc<dyn InFlight>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
