//! # Deferred Mutation Queue
//!
//! Structural changes to the [`RecordStore`] never happen while a query is
//! reading it. Queries enqueue closures here instead; the closures run in
//! FIFO order when the queue is flushed at the synchronization point.
//!
//! All mutations are:
//! - Deferred until [`MutationQueue::flush`]
//! - Applied in the order they were enqueued
//! - Applied exactly once

use crate::store::{Record, RecordStore};
use crate::Entity;
use std::collections::VecDeque;
use std::fmt;

type Mutation = Box<dyn FnOnce(&mut RecordStore)>;

/// Ordered list of pending writes to the record store.
#[derive(Default)]
pub struct MutationQueue {
    pending: VecDeque<Mutation>,
}

impl fmt::Debug for MutationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl MutationQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an arbitrary mutation.
    pub fn enqueue(&mut self, mutation: impl FnOnce(&mut RecordStore) + 'static) {
        self.pending.push_back(Box::new(mutation));
    }

    /// Enqueue attaching `record` to `entity`.
    pub fn attach<R: Record>(&mut self, entity: Entity, record: R) {
        self.enqueue(move |store| store.attach(entity, record));
    }

    /// Enqueue removing the record of type `R` from `entity`.
    pub fn remove<R: Record>(&mut self, entity: Entity) {
        self.enqueue(move |store| {
            store.remove::<R>(entity);
        });
    }

    /// Number of mutations waiting for the next flush.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every pending mutation in FIFO order. Returns how many ran.
    ///
    /// Mutations enqueued by a running mutation are not possible (closures only
    /// see the store), so one call always leaves the queue empty.
    pub fn flush(&mut self, store: &mut RecordStore) -> usize {
        let mut applied = 0;
        while let Some(mutation) = self.pending.pop_front() {
            mutation(store);
            applied += 1;
        }
        if applied > 0 {
            tracing::trace!(applied, "flushed deferred mutations");
        }
        applied
    }
}

// =============================================================================
// TESTS
// =============================================================================
