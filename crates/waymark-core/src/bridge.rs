//! # Road Bridge
//!
//! The interfaces through which the core reads the host's road network.
//!
//! The core never owns road data. It asks three collaborators:
//! - [`RoadNetwork`]: edges, nodes, lanes and placed objects by handle
//! - [`AddressSource`]: the building number at a point along an edge
//! - [`RoadBridge`]: which segments adjoin a placed object
//!
//! [`RoadWorld`](crate::network::RoadWorld) implements all three in memory.

use crate::geometry::Bezier;
use crate::query::{QueryVars, SegmentTarget};
use crate::{AggregateId, Entity, VersionToken};
use glam::{Quat, Vec3};

// =============================================================================
// ROAD DATA
// =============================================================================

/// One graph edge of the road network.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    pub start: Entity,
    pub end: Entity,
    pub curve: Bezier,
    /// Logical road this edge was split from, if any.
    pub aggregate: Option<AggregateId>,
}

impl RoadEdge {
    /// The endpoint that is not `node`. Returns `start` when `node` is neither.
    #[must_use]
    pub fn other_node(&self, node: Entity) -> Entity {
        if self.start == node { self.end } else { self.start }
    }
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoadNode {
    pub position: Vec3,
    pub connected_edges: Vec<Entity>,
    /// Sub-lanes owned by the node (sidewalk corners, crossings, ...).
    pub lanes: Vec<Entity>,
}

/// A lane owned by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub curve: Bezier,
    /// Lane carries pedestrians.
    pub pedestrian: bool,
    /// Lane is a marked crossing over the carriageway.
    pub crosswalk: bool,
}

impl Lane {
    /// Lanes a sign may stand on: pedestrian and not a crossing.
    #[must_use]
    pub fn accepts_signs(&self) -> bool {
        self.pedestrian && !self.crosswalk
    }
}

/// A placed prop, such as a street plate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub position: Vec3,
    pub rotation: Quat,
    /// Node the object was placed on.
    pub owner: Option<Entity>,
}

/// What the bridge reports about one adjoining segment of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRef {
    pub edge: Entity,
    /// Direction of the road leaving the node, as a 16-bit turn fraction.
    pub azimuth: u16,
    /// Point where the edge meets the object's node.
    pub center_point: Vec3,
    /// A point further along the edge.
    pub ref_point: Vec3,
    /// Content version of the edge; changes whenever the host modifies it.
    pub version: VersionToken,
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Read access to the road graph.
pub trait RoadNetwork {
    fn edge(&self, edge: Entity) -> Option<&RoadEdge>;

    fn node(&self, node: Entity) -> Option<&RoadNode>;

    fn lane(&self, lane: Entity) -> Option<&Lane>;

    fn object(&self, object: Entity) -> Option<&PlacedObject>;

    /// Content version of `edge`. Changes whenever its geometry or numbering does.
    fn edge_version(&self, edge: Entity) -> Option<VersionToken>;

    fn aggregate_of(&self, edge: Entity) -> Option<AggregateId> {
        self.edge(edge)?.aggregate
    }

    /// If `node` is a pass-through node for `edge`, the other edge through it.
    ///
    /// A node is pass-through when it has exactly two connected edges and both
    /// belong to the aggregate of `edge`.
    fn pass_through_neighbor(&self, node: Entity, edge: Entity) -> Option<Entity> {
        let aggregate = self.aggregate_of(edge)?;
        let [first, second] = self.node(node)?.connected_edges.as_slice() else {
            return None;
        };
        let other = match (*first == edge, *second == edge) {
            (true, false) => *second,
            (false, true) => *first,
            _ => return None,
        };
        (self.aggregate_of(other) == Some(aggregate)).then_some(other)
    }
}

/// Building numbers along edges. Treated as ground truth.
pub trait AddressSource {
    /// Address at parameter `t` on `edge`, as seen from `reference`.
    ///
    /// Without a reference the raw number of the street axis is returned; with
    /// one, the number is on the reference's side of the street.
    fn address(&self, reference: Option<Entity>, edge: Entity, t: f32) -> Option<i32>;
}

/// Adjoining segments of placed objects.
pub trait RoadBridge {
    /// The edge the object stands next to.
    fn own_segment(&self, object: Entity) -> Option<SegmentRef>;

    /// The paired edge across the corner from the own edge.
    fn side_segment(&self, object: Entity) -> Option<SegmentRef>;

    /// The segment selected by the query variables.
    fn target_segment(&self, object: Entity, vars: &QueryVars) -> Option<SegmentRef> {
        match vars.target() {
            SegmentTarget::Own => self.own_segment(object),
            SegmentTarget::Side => self.side_segment(object),
        }
    }
}

/// Everything the resolver needs from the host.
pub trait RoadHost: RoadNetwork + AddressSource + RoadBridge {}

impl<T: RoadNetwork + AddressSource + RoadBridge> RoadHost for T {}
