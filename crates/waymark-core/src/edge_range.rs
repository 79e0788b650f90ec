//! # Edge Address-Range Cache
//!
//! Per-edge `{min, max, version}` records, computed lazily.
//!
//! A query that touches an edge without a record gets [`RangeLookup::Pending`]
//! and the edge goes on a deduplicated worklist. The worklist is drained at the
//! next synchronization point: the addressing function is sampled near both
//! ends of the edge, a fresh [`VersionToken`] is minted and the record is
//! written through the [`MutationQueue`].
//!
//! Each record also keeps the host's content version of the edge it was
//! sampled from. A lookup that finds the host version moved on treats the
//! record as absent: it is invalidated and the lookup reports pending, no
//! matter which object or which walk asked.
//!
//! Records are never overwritten implicitly. [`EdgeRangeCache::invalidate`]
//! removes the record at the next flush and schedules a recomputation.

use crate::bridge::{AddressSource, RoadNetwork};
use crate::mutation::MutationQueue;
use crate::primitives::{RANGE_SAMPLE_END, RANGE_SAMPLE_START};
use crate::store::RecordStore;
use crate::{Entity, VersionToken};
use std::collections::{BTreeSet, VecDeque};

/// Cached address range of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAddressRange {
    pub min_number: i32,
    pub max_number: i32,
    pub version: VersionToken,
    /// Host content version of the edge when it was sampled.
    pub source_version: VersionToken,
}

/// Result of asking the cache for an edge's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeLookup {
    Ready(EdgeAddressRange),
    /// Not computed yet; retry after the next synchronization.
    Pending,
}

impl RangeLookup {
    #[must_use]
    pub fn ready(self) -> Option<EdgeAddressRange> {
        match self {
            Self::Ready(range) => Some(range),
            Self::Pending => None,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Worklist and invalidation state of the edge range cache.
///
/// The records themselves live in the [`RecordStore`].
#[derive(Debug, Clone, Default)]
pub struct EdgeRangeCache {
    /// Edges waiting for the next pass, in scheduling order.
    worklist: VecDeque<Entity>,
    /// Membership index of `worklist`.
    scheduled: BTreeSet<Entity>,
    /// Edges whose record is queued for removal and must not be served.
    invalidated: BTreeSet<Entity>,
}

impl EdgeRangeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached range of `edge`, or schedule it and report pending.
    ///
    /// A record sampled from an older version of the edge is invalidated
    /// through `queue` and reported pending.
    pub fn ensure_range<H>(
        &mut self,
        host: &H,
        store: &RecordStore,
        queue: &mut MutationQueue,
        edge: Entity,
    ) -> RangeLookup
    where
        H: RoadNetwork + ?Sized,
    {
        if self.invalidated.contains(&edge) {
            self.schedule(edge);
            return RangeLookup::Pending;
        }
        match store.get::<EdgeAddressRange>(edge) {
            Some(range) if host.edge_version(edge) == Some(range.source_version) => {
                RangeLookup::Ready(*range)
            }
            Some(_) => {
                self.invalidate(edge, queue);
                RangeLookup::Pending
            }
            None => {
                self.schedule(edge);
                RangeLookup::Pending
            }
        }
    }

    /// Put `edge` on the worklist. Returns `false` if it was already there.
    pub fn schedule(&mut self, edge: Entity) -> bool {
        if self.scheduled.insert(edge) {
            self.worklist.push_back(edge);
            true
        } else {
            false
        }
    }

    /// Drop the record of `edge` at the next flush and compute it again.
    pub fn invalidate(&mut self, edge: Entity, queue: &mut MutationQueue) {
        tracing::debug!(%edge, "invalidating edge address range");
        queue.remove::<EdgeAddressRange>(edge);
        self.invalidated.insert(edge);
        self.schedule(edge);
    }

    /// Number of edges waiting for the next pass.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.worklist.len()
    }

    #[must_use]
    pub fn is_scheduled(&self, edge: Entity) -> bool {
        self.scheduled.contains(&edge)
    }

    /// Drain the worklist, staging new records into `queue`.
    ///
    /// Must run right after `queue` was flushed into `store`, so that removals
    /// requested by [`invalidate`](Self::invalidate) are already applied.
    /// Pass-through neighbours of computed edges are scheduled for the next
    /// pass. Returns the number of records staged.
    pub fn process<H>(&mut self, host: &H, store: &RecordStore, queue: &mut MutationQueue) -> usize
    where
        H: RoadNetwork + AddressSource + ?Sized,
    {
        self.invalidated.clear();
        let batch: Vec<Entity> = self.worklist.drain(..).collect();
        self.scheduled.clear();

        let mut computed = BTreeSet::new();
        for edge in batch {
            if computed.contains(&edge) || store.contains::<EdgeAddressRange>(edge) {
                continue;
            }
            let (Some(road), Some(source_version)) = (host.edge(edge), host.edge_version(edge)) else {
                tracing::debug!(%edge, "edge vanished before its range was computed");
                continue;
            };
            let Some(range) = sample_range(host, edge, source_version) else {
                tracing::warn!(%edge, "addressing collaborator returned no number");
                continue;
            };

            queue.attach(edge, range);
            computed.insert(edge);

            if road.aggregate.is_none() {
                continue;
            }
            for node in [road.start, road.end] {
                if let Some(neighbor) = host.pass_through_neighbor(node, edge) {
                    if !computed.contains(&neighbor) && !store.contains::<EdgeAddressRange>(neighbor)
                    {
                        self.schedule(neighbor);
                    }
                }
            }
        }

        computed.len()
    }
}

/// Sample the addressing function near both ends of `edge`, ascending.
fn sample_range<H>(host: &H, edge: Entity, source_version: VersionToken) -> Option<EdgeAddressRange>
where
    H: AddressSource + ?Sized,
{
    let start = host.address(None, edge, RANGE_SAMPLE_START)?;
    let end = host.address(None, edge, RANGE_SAMPLE_END)?;
    Some(EdgeAddressRange {
        min_number: start.min(end),
        max_number: start.max(end),
        version: VersionToken::fresh(),
        source_version,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeAddressing, RoadWorld};
    use crate::AggregateId;
    use glam::Vec3;

    fn sync(cache: &mut EdgeRangeCache, world: &RoadWorld, store: &mut RecordStore, queue: &mut MutationQueue) -> usize {
        queue.flush(store);
        let computed = cache.process(world, store, queue);
        queue.flush(store);
        computed
    }

    /// Three edges of one road with two pass-through nodes between them.
    fn chain() -> (RoadWorld, [Entity; 3]) {
        let mut world = RoadWorld::new();
        let road = Some(AggregateId(1));
        let n: Vec<Entity> = (0..4)
            .map(|i| world.add_node(Vec3::new(i as f32 * 100.0, 0.0, 0.0)))
            .collect();
        let e0 = world
            .add_straight_edge(n[0], n[1], road, EdgeAddressing::new(0, 100))
            .expect("edge");
        let e1 = world
            .add_straight_edge(n[1], n[2], road, EdgeAddressing::new(100, 200))
            .expect("edge");
        let e2 = world
            .add_straight_edge(n[2], n[3], road, EdgeAddressing::new(200, 300))
            .expect("edge");
        (world, [e0, e1, e2])
    }

    #[test]
    fn first_lookup_is_pending_then_ready() {
        let (world, [e0, ..]) = chain();
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        assert!(cache.ensure_range(&world, &store, &mut queue, e0).is_pending());
        assert!(cache.is_scheduled(e0));
        assert_eq!(sync(&mut cache, &world, &mut store, &mut queue), 1);

        let range = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");
        assert_eq!((range.min_number, range.max_number), (5, 95));
    }

    #[test]
    fn samples_are_ordered_ascending_for_descending_edges() {
        let mut world = RoadWorld::new();
        let a = world.add_node(Vec3::ZERO);
        let b = world.add_node(Vec3::new(50.0, 0.0, 0.0));
        let edge = world
            .add_straight_edge(a, b, None, EdgeAddressing::new(300, 200))
            .expect("edge");
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        cache.ensure_range(&world, &store, &mut queue, edge);
        sync(&mut cache, &world, &mut store, &mut queue);

        let range = cache.ensure_range(&world, &store, &mut queue, edge).ready().expect("ready");
        assert_eq!((range.min_number, range.max_number), (205, 295));
    }

    #[test]
    fn computation_warms_pass_through_neighbours_one_hop_per_cycle() {
        let (world, [e0, e1, e2]) = chain();
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        cache.ensure_range(&world, &store, &mut queue, e0);
        sync(&mut cache, &world, &mut store, &mut queue);
        assert!(cache.is_scheduled(e1));
        assert!(!cache.is_scheduled(e2));

        sync(&mut cache, &world, &mut store, &mut queue);
        assert!(store.contains::<EdgeAddressRange>(e1));
        assert!(cache.is_scheduled(e2));

        sync(&mut cache, &world, &mut store, &mut queue);
        assert!(store.contains::<EdgeAddressRange>(e2));
        assert_eq!(cache.pending(), 0);
    }

    #[test]
    fn repeated_reads_return_the_same_token() {
        let (world, [e0, ..]) = chain();
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        cache.ensure_range(&world, &store, &mut queue, e0);
        sync(&mut cache, &world, &mut store, &mut queue);

        let first = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");
        let second = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");
        assert_eq!(first.version, second.version);
    }

    #[test]
    fn invalidation_yields_a_new_token() {
        let (world, [e0, ..]) = chain();
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        cache.ensure_range(&world, &store, &mut queue, e0);
        sync(&mut cache, &world, &mut store, &mut queue);
        let before = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");

        cache.invalidate(e0, &mut queue);
        // Record still physically present but no longer served.
        assert!(store.contains::<EdgeAddressRange>(e0));
        assert!(cache.ensure_range(&world, &store, &mut queue, e0).is_pending());

        sync(&mut cache, &world, &mut store, &mut queue);
        let after = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");
        assert_ne!(before.version, after.version);
        assert_eq!(before.min_number, after.min_number);
    }

    #[test]
    fn renumbered_edge_is_served_again_only_after_recomputation() {
        let (mut world, [e0, ..]) = chain();
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        cache.ensure_range(&world, &store, &mut queue, e0);
        sync(&mut cache, &world, &mut store, &mut queue);
        let before = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");

        world
            .set_addressing(e0, EdgeAddressing::new(1000, 1100))
            .expect("renumber");
        assert!(cache.ensure_range(&world, &store, &mut queue, e0).is_pending());
        assert!(cache.ensure_range(&world, &store, &mut queue, e0).is_pending());
        assert!(cache.is_scheduled(e0));

        sync(&mut cache, &world, &mut store, &mut queue);
        let after = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");
        assert_eq!((after.min_number, after.max_number), (1005, 1095));
        assert_eq!(Some(after.source_version), world.edge_version(e0));
        assert_ne!(before.version, after.version);
    }

    #[test]
    fn touched_edge_without_renumbering_gets_a_new_token() {
        let (mut world, [e0, ..]) = chain();
        let mut store = RecordStore::new();
        let mut queue = MutationQueue::new();
        let mut cache = EdgeRangeCache::new();

        cache.ensure_range(&world, &store, &mut queue, e0);
        sync(&mut cache, &world, &mut store, &mut queue);
        let before = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");

        world.touch_edge(e0).expect("touch");
        assert!(cache.ensure_range(&world, &store, &mut queue, e0).is_pending());
        sync(&mut cache, &world, &mut store, &mut queue);

        let after = cache.ensure_range(&world, &store, &mut queue, e0).ready().expect("ready");
        assert_eq!(before.min_number, after.min_number);
        assert_ne!(before.version, after.version);
    }

    #[test]
    fn scheduling_is_deduplicated() {
        let mut cache = EdgeRangeCache::new();
        assert!(cache.schedule(Entity(9)));
        assert!(!cache.schedule(Entity(9)));
        assert_eq!(cache.pending(), 1);
    }
}
