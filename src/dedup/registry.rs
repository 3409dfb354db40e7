//! In-flight request registry.
//!
//! # Invariants
//! - At most one in-flight dispatch per key
//! - A registration is removed when its dispatch settles, through the
//!   [`PendingGuard`] owned by the dispatch task. Observers dropping their
//!   handles has no effect on the registration.
//! - A guard only removes the registration it created, never a newer one
//!   for the same key (e.g. after `clear`)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};

use crate::pipeline::PipelineError;
use crate::request::{RequestKey, ResponseSnapshot};

/// Outcome shared by every caller of one dispatch.
pub type DispatchOutcome = Result<ResponseSnapshot, PipelineError>;

/// Multi-waiter handle to an in-flight dispatch.
pub type SharedDispatch = Shared<BoxFuture<'static, DispatchOutcome>>;

struct PendingEntry {
    id: u64,
    handle: SharedDispatch,
}

/// Result of [`PendingRequestRegistry::coalesce`].
pub enum Coalesced {
    /// A new dispatch was started and registered.
    Started(SharedDispatch),
    /// The caller attached to a dispatch already in flight.
    Joined(SharedDispatch),
}

impl Coalesced {
    pub fn into_handle(self) -> SharedDispatch {
        match self {
            Coalesced::Started(handle) | Coalesced::Joined(handle) => handle,
        }
    }
}

/// Map from request key to the in-flight dispatch for that key.
#[derive(Clone, Default)]
pub struct PendingRequestRegistry {
    entries: Arc<DashMap<RequestKey, PendingEntry>>,
    next_id: Arc<AtomicU64>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the dispatch registered under `key`, or start one with
    /// `start` and register it. The check and the insert happen under the
    /// same shard lock, so two callers can never both start.
    ///
    /// `start` receives the guard that releases the registration; it must
    /// move the guard into the task whose completion settles the dispatch.
    /// `start` runs while the shard lock is held and must not touch the
    /// registry.
    pub fn coalesce<F>(&self, key: RequestKey, start: F) -> Coalesced
    where
        F: FnOnce(PendingGuard) -> SharedDispatch,
    {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(entry) => Coalesced::Joined(entry.get().handle.clone()),
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = PendingGuard {
                    entries: self.entries.clone(),
                    key,
                    id,
                };
                let handle = start(guard);
                entry.insert(PendingEntry {
                    id,
                    handle: handle.clone(),
                });
                Coalesced::Started(handle)
            }
        }
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every registration. Running dispatches continue; their guards
    /// find nothing to remove.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Releases one registration when dropped, whether the dispatch succeeded,
/// failed, panicked or was aborted.
pub struct PendingGuard {
    entries: Arc<DashMap<RequestKey, PendingEntry>>,
    key: RequestKey,
    id: u64,
}

impl PendingGuard {
    pub fn key(&self) -> &RequestKey {
        &self.key
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let id = self.id;
        if self.entries.remove_if(&self.key, |_, entry| entry.id == id).is_some() {
            tracing::trace!(key = %self.key, "Released pending registration");
        }
    }
}
