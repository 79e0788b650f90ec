//! # Chain Walk
//!
//! Union of the address ranges of every edge that belongs to the same logical
//! street as a starting edge.
//!
//! The walk leaves the object's node along the starting edge and keeps going
//! through pass-through nodes. Each edge on the way is looked up in the
//! [`EdgeRangeCache`]; a missing or outdated range does not stop the walk, it
//! only marks the result incomplete so the caller can retry after the next
//! synchronization point. Outdated ranges anywhere on the chain are
//! invalidated through the queue on the way.

use crate::bridge::{AddressSource, RoadNetwork, SegmentRef};
use crate::edge_range::{EdgeRangeCache, RangeLookup};
use crate::mutation::MutationQueue;
use crate::primitives::MAX_CHAIN_LENGTH;
use crate::store::RecordStore;
use crate::Entity;
use std::collections::BTreeSet;

/// Outcome of walking one street chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRange {
    /// Lowest number of the chain, on the reference object's side.
    pub min_number: i32,
    /// Highest number of the chain, on the reference object's side.
    pub max_number: i32,
    /// Whether the end of the starting edge touching the object's node carries
    /// the lower numbers.
    pub node_is_min_end: bool,
    /// `false` when at least one edge of the chain had no range yet.
    pub complete: bool,
    pub edges_visited: usize,
}

/// Walk the street chain starting at `segment`, from the node owning `reference`.
///
/// Returns `None` when the host has no data for the object, its node or the
/// starting edge. An incomplete result is still returned so callers can tell
/// "not ready yet" from "nothing there".
pub fn walk_chain<H>(
    host: &H,
    store: &RecordStore,
    queue: &mut MutationQueue,
    cache: &mut EdgeRangeCache,
    reference: Entity,
    segment: &SegmentRef,
) -> Option<ChainRange>
where
    H: RoadNetwork + AddressSource + ?Sized,
{
    let mut from_node = host.object(reference)?.owner?;
    let start_edge = host.edge(segment.edge)?;

    // Numbers on the reference's side at both ends of the starting edge.
    let start_number = host.address(Some(reference), segment.edge, 0.0)?;
    let end_number = host.address(Some(reference), segment.edge, 1.0)?;

    let mut min_number = i32::MAX;
    let mut max_number = i32::MIN;
    let mut complete = true;
    let mut visited = BTreeSet::new();
    let mut current = segment.edge;

    while visited.len() < MAX_CHAIN_LENGTH && visited.insert(current) {
        let Some(edge) = host.edge(current) else {
            break;
        };

        match cache.ensure_range(host, store, queue, current) {
            RangeLookup::Ready(range) => {
                min_number = min_number.min(range.min_number);
                max_number = max_number.max(range.max_number);
            }
            RangeLookup::Pending => complete = false,
        }

        let next_node = edge.other_node(from_node);
        match host.pass_through_neighbor(next_node, current) {
            Some(next) => {
                from_node = next_node;
                current = next;
            }
            None => break,
        }
    }

    if visited.len() >= MAX_CHAIN_LENGTH {
        tracing::debug!(edge = %segment.edge, "chain walk hit the length bound");
    }

    // Snap both ends onto the reference's side of the street.
    let side_bit = start_number & 1;
    let min_number = (min_number & !1) | side_bit;
    let max_number = (max_number & !1) | side_bit;

    let start_is_near = start_edge.curve.a.distance_squared(segment.center_point)
        <= start_edge.curve.d.distance_squared(segment.center_point);
    let node_is_min_end = start_is_near == (start_number < end_number);

    Some(ChainRange {
        min_number,
        max_number,
        node_is_min_end,
        complete,
        edges_visited: visited.len(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
