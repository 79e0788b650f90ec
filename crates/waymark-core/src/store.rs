//! # Record Store
//!
//! Typed cache records attached to entities.
//!
//! The store is the write side of the world-state collaborator: records are
//! attached, read and removed by entity handle. Reads are free; writes only
//! happen while the [`MutationQueue`](crate::mutation::MutationQueue) is
//! flushed at a synchronization point.
//!
//! All tables use `BTreeMap` so iteration order is deterministic.

use crate::Entity;
use crate::edge_range::EdgeAddressRange;
use crate::placement::SignPlacementCache;
use std::collections::BTreeMap;

/// A record type that has a table in the [`RecordStore`].
pub trait Record: Clone + 'static {
    /// The table holding records of this type.
    fn table(store: &RecordStore) -> &BTreeMap<Entity, Self>;

    /// Mutable access to the table holding records of this type.
    fn table_mut(store: &mut RecordStore) -> &mut BTreeMap<Entity, Self>;
}

/// Storage for every record type the core attaches to entities.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    edge_ranges: BTreeMap<Entity, EdgeAddressRange>,
    sign_placements: BTreeMap<Entity, SignPlacementCache>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the record of type `R` attached to `entity`.
    #[must_use]
    pub fn get<R: Record>(&self, entity: Entity) -> Option<&R> {
        R::table(self).get(&entity)
    }

    /// Check whether a record of type `R` is attached to `entity`.
    #[must_use]
    pub fn contains<R: Record>(&self, entity: Entity) -> bool {
        R::table(self).contains_key(&entity)
    }

    /// Attach `record` to `entity`, replacing any record of the same type.
    pub fn attach<R: Record>(&mut self, entity: Entity, record: R) {
        R::table_mut(self).insert(entity, record);
    }

    /// Detach and return the record of type `R` from `entity`.
    pub fn remove<R: Record>(&mut self, entity: Entity) -> Option<R> {
        R::table_mut(self).remove(&entity)
    }

    /// Number of records of type `R`.
    #[must_use]
    pub fn count<R: Record>(&self) -> usize {
        R::table(self).len()
    }

    /// Drop every record of every type.
    pub fn clear(&mut self) {
        self.edge_ranges.clear();
        self.sign_placements.clear();
    }
}

impl Record for EdgeAddressRange {
    fn table(store: &RecordStore) -> &BTreeMap<Entity, Self> {
        &store.edge_ranges
    }

    fn table_mut(store: &mut RecordStore) -> &mut BTreeMap<Entity, Self> {
        &mut store.edge_ranges
    }
}

impl Record for SignPlacementCache {
    fn table(store: &RecordStore) -> &BTreeMap<Entity, Self> {
        &store.sign_placements
    }

    fn table_mut(store: &mut RecordStore) -> &mut BTreeMap<Entity, Self> {
        &mut store.sign_placements
    }
}
