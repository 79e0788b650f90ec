//! # Address Resolver
//!
//! The service hosts query to render street plates.
//!
//! ## Reads and Writes
//!
//! Queries may run many times per frame and never write the record store
//! directly. Everything they want to change goes through the
//! [`MutationQueue`] and becomes visible after [`AddressResolver::synchronize`].
//! A query that needs data which is not computed yet returns `None`; the same
//! query succeeds once the missing ranges were computed at a later
//! synchronization point.
//!
//! ## Synchronization cycle
//!
//! 1. Flush the queue (removals of stale records first).
//! 2. Compute every edge range waiting on the worklist.
//! 3. Flush again so the new records are visible to the next queries.

use crate::abbreviation::AbbreviationEngine;
use crate::bridge::{AddressSource, RoadHost, RoadNetwork, SegmentRef};
use crate::edge_range::{EdgeRangeCache, RangeLookup};
use crate::mutation::MutationQueue;
use crate::placement::{SideInput, SignPlacementCache, StreetNumberRange, compute_placement};
use crate::query::QueryVars;
use crate::store::RecordStore;
use crate::walk::{ChainRange, walk_chain};
use crate::Entity;
use glam::Vec3;
use std::sync::Arc;

/// Everything a plate shows for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct SignResolution {
    pub number_range: StreetNumberRange,
    /// Formatted and abbreviated range text.
    pub number_text: String,
    /// Euler angles in degrees; only the vertical axis is set.
    pub direction_angle: Vec3,
    pub offset_position: Vec3,
}

/// Summary of one synchronization point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub cycle: u64,
    pub mutations_applied: usize,
    pub edges_computed: usize,
    /// Edges scheduled for the next cycle.
    pub edges_pending: usize,
}

/// Street plate resolver with its caches.
#[derive(Debug)]
pub struct AddressResolver {
    records: RecordStore,
    queue: MutationQueue,
    edge_ranges: EdgeRangeCache,
    abbreviations: Arc<AbbreviationEngine>,
    cycle: u64,
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressResolver {
    /// Resolver with an empty abbreviation engine.
    #[must_use]
    pub fn new() -> Self {
        Self::with_abbreviations(Arc::new(AbbreviationEngine::new()))
    }

    /// Resolver sharing `abbreviations` with other owners (e.g. a file watcher).
    #[must_use]
    pub fn with_abbreviations(abbreviations: Arc<AbbreviationEngine>) -> Self {
        Self {
            records: RecordStore::new(),
            queue: MutationQueue::new(),
            edge_ranges: EdgeRangeCache::new(),
            abbreviations,
            cycle: 0,
        }
    }

    #[must_use]
    pub fn abbreviations(&self) -> &Arc<AbbreviationEngine> {
        &self.abbreviations
    }

    #[must_use]
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn pending_edges(&self) -> usize {
        self.edge_ranges.pending()
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    // =========================================================================
    // SYNCHRONIZATION
    // =========================================================================

    /// Run one synchronization point against `host`.
    pub fn synchronize<H>(&mut self, host: &H) -> SyncReport
    where
        H: RoadNetwork + AddressSource + ?Sized,
    {
        let mut mutations_applied = self.queue.flush(&mut self.records);
        let edges_computed = self
            .edge_ranges
            .process(host, &self.records, &mut self.queue);
        mutations_applied += self.queue.flush(&mut self.records);
        self.cycle += 1;

        let report = SyncReport {
            cycle: self.cycle,
            mutations_applied,
            edges_computed,
            edges_pending: self.edge_ranges.pending(),
        };
        if report.mutations_applied > 0 || report.edges_pending > 0 {
            tracing::debug!(
                cycle = report.cycle,
                mutations = report.mutations_applied,
                computed = report.edges_computed,
                pending = report.edges_pending,
                "synchronized"
            );
        }
        report
    }

    /// Drop every cached record and pending work.
    pub fn reset(&mut self) {
        self.records.clear();
        self.queue = MutationQueue::new();
        self.edge_ranges = EdgeRangeCache::new();
    }

    // =========================================================================
    // EDGE RANGES
    // =========================================================================

    /// Cached range of `edge`, scheduling it when missing or outdated.
    pub fn ensure_range<H>(&mut self, host: &H, edge: Entity) -> RangeLookup
    where
        H: RoadNetwork + ?Sized,
    {
        self.edge_ranges
            .ensure_range(host, &self.records, &mut self.queue, edge)
    }

    /// Forget the range of `edge` and recompute it at the next synchronization.
    pub fn invalidate_edge(&mut self, edge: Entity) {
        self.edge_ranges.invalidate(edge, &mut self.queue);
    }

    /// Walk the street chain of `segment` from the node of `reference`.
    pub fn walk_chain<H>(&mut self, host: &H, reference: Entity, segment: &SegmentRef) -> Option<ChainRange>
    where
        H: RoadNetwork + AddressSource + ?Sized,
    {
        walk_chain(
            host,
            &self.records,
            &mut self.queue,
            &mut self.edge_ranges,
            reference,
            segment,
        )
    }

    // =========================================================================
    // SIGN QUERIES
    // =========================================================================

    /// Resolve everything a plate shows. `None` means "show the default".
    pub fn resolve<H>(&mut self, host: &H, object: Entity, vars: &QueryVars) -> Option<SignResolution>
    where
        H: RoadHost + ?Sized,
    {
        let segment = host.target_segment(object, vars)?;
        let placement = self.placement_for(host, object)?;
        let side = placement.side(segment.edge)?;

        let number_range = side.number_range();
        let number_text = self.abbreviations.apply(&number_range.format(vars));
        Some(SignResolution {
            number_range,
            number_text,
            direction_angle: Vec3::new(0.0, side.road_angle, 0.0),
            offset_position: placement.offset_position,
        })
    }

    pub fn number_range<H>(&mut self, host: &H, object: Entity, vars: &QueryVars) -> Option<StreetNumberRange>
    where
        H: RoadHost + ?Sized,
    {
        self.resolve(host, object, vars).map(|r| r.number_range)
    }

    pub fn number_range_text<H>(&mut self, host: &H, object: Entity, vars: &QueryVars) -> Option<String>
    where
        H: RoadHost + ?Sized,
    {
        self.resolve(host, object, vars).map(|r| r.number_text)
    }

    pub fn direction_angle<H>(&mut self, host: &H, object: Entity, vars: &QueryVars) -> Option<Vec3>
    where
        H: RoadHost + ?Sized,
    {
        self.resolve(host, object, vars).map(|r| r.direction_angle)
    }

    pub fn offset_position<H>(&mut self, host: &H, object: Entity, vars: &QueryVars) -> Option<Vec3>
    where
        H: RoadHost + ?Sized,
    {
        self.resolve(host, object, vars).map(|r| r.offset_position)
    }

    /// Cached placement of `object` if both chains still match it, else a rebuilt one.
    ///
    /// Both chains are walked on every query, so an edit on any edge of
    /// either street is noticed by every object that shows it.
    fn placement_for<H>(&mut self, host: &H, object: Entity) -> Option<SignPlacementCache>
    where
        H: RoadHost + ?Sized,
    {
        let own = host.own_segment(object)?;
        let side = host.side_segment(object)?;

        // Walk both before bailing out so both chains get scheduled.
        let own_range = self.walk_chain(host, object, &own);
        let side_range = self.walk_chain(host, object, &side);
        let (own_range, side_range) = (own_range?, side_range?);
        let this = SideInput {
            segment: &own,
            range: &own_range,
        };
        let other = SideInput {
            segment: &side,
            range: &side_range,
        };

        if let Some(cached) = self.records.get::<SignPlacementCache>(object).copied() {
            if cached.this_side.matches(this) && cached.other_side.matches(other) {
                return Some(cached);
            }
            tracing::debug!(%object, "sign placement is stale");
            self.queue.remove::<SignPlacementCache>(object);
        }

        if !own_range.complete || !side_range.complete {
            return None;
        }
        let placement = compute_placement(host, object, this, other)?;
        self.queue.attach(object, placement);
        Some(placement)
    }
}

// =============================================================================
// TESTS
// =============================================================================
