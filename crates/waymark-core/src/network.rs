//! # In-Memory Road World
//!
//! A self-contained host implementing every collaborator trait of
//! [`bridge`](crate::bridge). Used by the CLI to run scenarios from files and
//! by the test suites.
//!
//! ## Addressing
//!
//! Each edge carries a linear numbering from `start_number` (at the start
//! node) to `end_number` (at the end node). With a reference object, the
//! number is snapped onto the object's side of the street: odd on the right
//! of the edge direction, even on the left.
//!
//! Every edit of an edge mints a new [`VersionToken`] so that cached sign
//! placements notice the change.

use crate::bridge::{
    AddressSource, Lane, PlacedObject, RoadBridge, RoadEdge, RoadNetwork, RoadNode, SegmentRef,
};
use crate::geometry::{Bezier, bearing_to_point, degrees_to_azimuth, is_odd_side, planar};
use crate::{AggregateId, Entity, VersionToken, WaymarkError};
use glam::{Vec2, Vec3};
use std::collections::BTreeMap;

/// Linear house numbering of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAddressing {
    pub start_number: i32,
    pub end_number: i32,
}

impl EdgeAddressing {
    #[must_use]
    pub const fn new(start_number: i32, end_number: i32) -> Self {
        Self {
            start_number,
            end_number,
        }
    }

    /// Raw number at parameter `t`.
    ///
    /// Computed in `i64` so spans wider than `i32` do not overflow.
    #[must_use]
    pub fn at(&self, t: f32) -> i32 {
        let start = i64::from(self.start_number);
        let span = i64::from(self.end_number) - start;
        let offset = (span as f64 * f64::from(t)).round() as i64;
        (start + offset).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

#[derive(Debug, Clone)]
struct EdgeEntry {
    road: RoadEdge,
    addressing: EdgeAddressing,
    version: VersionToken,
}

#[derive(Debug, Clone)]
struct ObjectEntry {
    object: PlacedObject,
    own_edge: Option<Entity>,
    side_edge: Option<Entity>,
}

/// Arena of nodes, edges, lanes and placed objects sharing one handle space.
#[derive(Debug, Clone, Default)]
pub struct RoadWorld {
    nodes: BTreeMap<Entity, RoadNode>,
    edges: BTreeMap<Entity, EdgeEntry>,
    lanes: BTreeMap<Entity, Lane>,
    objects: BTreeMap<Entity, ObjectEntry>,
    next_entity: u64,
}

impl RoadWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> Entity {
        self.next_entity += 1;
        Entity(self.next_entity)
    }

    pub fn add_node(&mut self, position: Vec3) -> Entity {
        let id = self.allocate();
        self.nodes.insert(
            id,
            RoadNode {
                position,
                ..RoadNode::default()
            },
        );
        id
    }

    /// Add an edge between two existing nodes.
    pub fn add_edge(
        &mut self,
        start: Entity,
        end: Entity,
        curve: Bezier,
        aggregate: Option<AggregateId>,
        addressing: EdgeAddressing,
    ) -> Result<Entity, WaymarkError> {
        if start == end {
            return Err(WaymarkError::ScenarioError(format!(
                "edge would start and end at node {start}"
            )));
        }
        self.require_node(start)?;
        self.require_node(end)?;

        let id = self.allocate();
        for node in [start, end] {
            if let Some(entry) = self.nodes.get_mut(&node) {
                entry.connected_edges.push(id);
            }
        }
        self.edges.insert(
            id,
            EdgeEntry {
                road: RoadEdge {
                    start,
                    end,
                    curve,
                    aggregate,
                },
                addressing,
                version: VersionToken::fresh(),
            },
        );
        Ok(id)
    }

    /// Add a straight edge between the positions of two existing nodes.
    pub fn add_straight_edge(
        &mut self,
        start: Entity,
        end: Entity,
        aggregate: Option<AggregateId>,
        addressing: EdgeAddressing,
    ) -> Result<Entity, WaymarkError> {
        let from = self.require_node(start)?.position;
        let to = self.require_node(end)?.position;
        self.add_edge(start, end, Bezier::line(from, to), aggregate, addressing)
    }

    /// Add a lane owned by `node`.
    pub fn add_lane(&mut self, node: Entity, lane: Lane) -> Result<Entity, WaymarkError> {
        self.require_node(node)?;
        let id = self.allocate();
        self.lanes.insert(id, lane);
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.lanes.push(id);
        }
        Ok(id)
    }

    /// Place an object and record which edges adjoin it.
    pub fn add_object(
        &mut self,
        object: PlacedObject,
        own_edge: Option<Entity>,
        side_edge: Option<Entity>,
    ) -> Result<Entity, WaymarkError> {
        if let Some(owner) = object.owner {
            self.require_node(owner)?;
        }
        for edge in own_edge.iter().chain(side_edge.iter()) {
            self.require_edge(*edge)?;
        }
        let id = self.allocate();
        self.objects.insert(
            id,
            ObjectEntry {
                object,
                own_edge,
                side_edge,
            },
        );
        Ok(id)
    }

    /// Renumber an edge. Mints a new content version.
    pub fn set_addressing(&mut self, edge: Entity, addressing: EdgeAddressing) -> Result<(), WaymarkError> {
        let entry = self.require_edge_mut(edge)?;
        entry.addressing = addressing;
        entry.version = VersionToken::fresh();
        Ok(())
    }

    /// Mark an edge as modified without changing its numbering.
    pub fn touch_edge(&mut self, edge: Entity) -> Result<(), WaymarkError> {
        self.require_edge_mut(edge)?.version = VersionToken::fresh();
        Ok(())
    }

    #[must_use]
    pub fn addressing(&self, edge: Entity) -> Option<EdgeAddressing> {
        self.edges.get(&edge).map(|entry| entry.addressing)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Handles of all placed objects, ascending.
    pub fn object_ids(&self) -> impl Iterator<Item = Entity> + '_ {
        self.objects.keys().copied()
    }

    fn require_node(&self, node: Entity) -> Result<&RoadNode, WaymarkError> {
        self.nodes
            .get(&node)
            .ok_or_else(|| WaymarkError::ScenarioError(format!("unknown node {node}")))
    }

    fn require_edge(&self, edge: Entity) -> Result<&EdgeEntry, WaymarkError> {
        self.edges
            .get(&edge)
            .ok_or_else(|| WaymarkError::ScenarioError(format!("unknown edge {edge}")))
    }

    fn require_edge_mut(&mut self, edge: Entity) -> Result<&mut EdgeEntry, WaymarkError> {
        self.edges
            .get_mut(&edge)
            .ok_or_else(|| WaymarkError::ScenarioError(format!("unknown edge {edge}")))
    }

    /// Describe `edge` as seen from the node of `entry`.
    fn segment(&self, entry: &ObjectEntry, edge: Entity) -> Option<SegmentRef> {
        let edge_entry = self.edges.get(&edge)?;
        let curve = &edge_entry.road.curve;

        let anchor = entry
            .object
            .owner
            .and_then(|owner| self.nodes.get(&owner))
            .map_or(entry.object.position, |node| node.position);
        let from_start = anchor.distance_squared(curve.a) <= anchor.distance_squared(curve.d);

        let (center_point, heading) = if from_start {
            (curve.a, curve.tangent(0.0))
        } else {
            (curve.d, -curve.tangent(1.0))
        };
        let bearing = bearing_to_point(Vec2::ZERO, planar(heading));

        Some(SegmentRef {
            edge,
            azimuth: degrees_to_azimuth(bearing),
            center_point,
            ref_point: curve.midpoint(),
            version: edge_entry.version,
        })
    }
}

impl RoadNetwork for RoadWorld {
    fn edge(&self, edge: Entity) -> Option<&RoadEdge> {
        self.edges.get(&edge).map(|entry| &entry.road)
    }

    fn node(&self, node: Entity) -> Option<&RoadNode> {
        self.nodes.get(&node)
    }

    fn lane(&self, lane: Entity) -> Option<&Lane> {
        self.lanes.get(&lane)
    }

    fn object(&self, object: Entity) -> Option<&PlacedObject> {
        self.objects.get(&object).map(|entry| &entry.object)
    }

    fn edge_version(&self, edge: Entity) -> Option<VersionToken> {
        self.edges.get(&edge).map(|entry| entry.version)
    }
}

impl AddressSource for RoadWorld {
    fn address(&self, reference: Option<Entity>, edge: Entity, t: f32) -> Option<i32> {
        let entry = self.edges.get(&edge)?;
        let raw = entry.addressing.at(t);
        let Some(reference) = reference else {
            return Some(raw);
        };

        let position = self.objects.get(&reference)?.object.position;
        let curve = &entry.road.curve;
        let (_, nearest) = curve.closest_planar(planar(position));
        let side_bit = i32::from(is_odd_side(position, curve, nearest));
        Some((raw & !1) | side_bit)
    }
}

impl RoadBridge for RoadWorld {
    fn own_segment(&self, object: Entity) -> Option<SegmentRef> {
        let entry = self.objects.get(&object)?;
        self.segment(entry, entry.own_edge?)
    }

    fn side_segment(&self, object: Entity) -> Option<SegmentRef> {
        let entry = self.objects.get(&object)?;
        self.segment(entry, entry.side_edge?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
