//! # Sign Placement
//!
//! Everything a street plate needs, computed once per object and cached:
//! the number range of both adjoining streets, the road angle of each street
//! relative to the object, and where on the corner sidewalk the plate stands.
//!
//! ## Staleness
//!
//! A cached placement remembers the edge, edge version and chain range of both
//! sides. It is served only while both current segments and both freshly
//! walked chains agree with what it remembers, so a change on any edge of
//! either chain makes it stale.

use crate::bridge::{RoadNetwork, RoadNode, SegmentRef};
use crate::geometry::{
    Bezier, azimuth_to_degrees, bearing_difference, bearing_to_point, is_odd_side,
    local_planar_offset, planar, yaw_degrees,
};
use crate::query::QueryVars;
use crate::walk::ChainRange;
use crate::{Entity, VersionToken};
use glam::Vec3;

// =============================================================================
// CACHED RECORD
// =============================================================================

/// Cached data for one adjoining street of a sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidePlacement {
    pub edge: Entity,
    pub version: VersionToken,
    pub min_number: i32,
    pub max_number: i32,
    pub node_is_min_end: bool,
    /// Road angle in degrees, relative to the object's own heading.
    pub road_angle: f32,
}

impl SidePlacement {
    /// Whether this side still describes `input`: same edge and version, and a
    /// complete chain with the same numbers.
    #[must_use]
    pub fn matches(&self, input: SideInput<'_>) -> bool {
        self.edge == input.segment.edge
            && self.version == input.segment.version
            && input.range.complete
            && self.min_number == input.range.min_number
            && self.max_number == input.range.max_number
            && self.node_is_min_end == input.range.node_is_min_end
    }

    #[must_use]
    pub fn number_range(&self) -> StreetNumberRange {
        StreetNumberRange {
            min_number: self.min_number,
            max_number: self.max_number,
            node_is_min_end: self.node_is_min_end,
        }
    }
}

/// Cached placement of one sign object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignPlacementCache {
    /// The own edge of the object.
    pub this_side: SidePlacement,
    /// The paired side edge.
    pub other_side: SidePlacement,
    /// Sign position in the object's local frame, on the ground plane.
    pub offset_position: Vec3,
    /// Bearing from the corner towards the chosen sign position.
    pub target_angle: f32,
    /// Whether the object stands on the odd side of the own edge.
    pub odd_side: bool,
}

impl SignPlacementCache {
    /// The remembered side for `edge`, if either side matches it.
    #[must_use]
    pub fn side(&self, edge: Entity) -> Option<&SidePlacement> {
        if self.this_side.edge == edge {
            Some(&self.this_side)
        } else if self.other_side.edge == edge {
            Some(&self.other_side)
        } else {
            None
        }
    }

    /// Whether a query for `edge` at `version` can be served from this record.
    #[must_use]
    pub fn is_up_to_date(&self, edge: Entity, version: VersionToken) -> bool {
        self.side(edge).is_some_and(|side| side.version == version)
    }
}

// =============================================================================
// NUMBER RANGE
// =============================================================================

/// Number range of one street as printed on a plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreetNumberRange {
    pub min_number: i32,
    pub max_number: i32,
    /// Whether the sign's end of the street carries the lower numbers.
    pub node_is_min_end: bool,
}

impl StreetNumberRange {
    /// Render as `"{near}{sep}{far}"`, or the reverse when `inverted` is set.
    ///
    /// The number at the sign's end of the street comes first by default.
    /// The larger number therefore leads iff `inverted == node_is_min_end`,
    /// the reverse of `inverted XOR node_is_min_end`.
    #[must_use]
    pub fn format(&self, vars: &QueryVars) -> String {
        let separator = vars.separator();
        if vars.is_inverted() == self.node_is_min_end {
            format!("{}{}{}", self.max_number, separator, self.min_number)
        } else {
            format!("{}{}{}", self.min_number, separator, self.max_number)
        }
    }
}

// =============================================================================
// PLACEMENT COMPUTATION
// =============================================================================

/// One adjoining street, as input to [`compute_placement`].
#[derive(Debug, Clone, Copy)]
pub struct SideInput<'a> {
    pub segment: &'a SegmentRef,
    pub range: &'a ChainRange,
}

/// Compute the placement of `object` from its two adjoining streets.
///
/// Returns `None` when the host lacks the object, its node or the own edge.
pub fn compute_placement<H>(
    host: &H,
    object: Entity,
    this: SideInput<'_>,
    other: SideInput<'_>,
) -> Option<SignPlacementCache>
where
    H: RoadNetwork + ?Sized,
{
    let placed = host.object(object)?;
    let node = host.node(placed.owner?)?;
    let this_curve = host.edge(this.segment.edge)?.curve;

    let this_angle = azimuth_to_degrees(this.segment.azimuth);
    let other_angle = azimuth_to_degrees(other.segment.azimuth);

    // Curve from the node center out to the middle of the own edge.
    let edge_mid = this_curve.midpoint();
    let towards_edge = Bezier::new(node.position, this.segment.center_point, edge_mid, edge_mid);
    let odd_side = is_odd_side(placed.position, &towards_edge, 0.5);

    let wrap = if (this_angle > other_angle) == odd_side { 360.0 } else { 0.0 };
    let target_angle = ((this_angle + other_angle + wrap) / 2.0).rem_euclid(360.0);

    let sign_position = nearest_sidewalk_point(host, node, this.segment.center_point, target_angle)
        .unwrap_or(placed.position);
    let offset_position = local_planar_offset(placed.position, placed.rotation, sign_position);

    let heading = yaw_degrees(placed.rotation);
    let side = |input: SideInput<'_>, angle: f32| SidePlacement {
        edge: input.segment.edge,
        version: input.segment.version,
        min_number: input.range.min_number,
        max_number: input.range.max_number,
        node_is_min_end: input.range.node_is_min_end,
        road_angle: (angle - heading).rem_euclid(360.0),
    };

    Some(SignPlacementCache {
        this_side: side(this, this_angle),
        other_side: side(other, other_angle),
        offset_position,
        target_angle,
        odd_side,
    })
}

/// Closest point on a sign-bearing lane of `node` in the direction of `target_angle`.
fn nearest_sidewalk_point<H>(host: &H, node: &RoadNode, center: Vec3, target_angle: f32) -> Option<Vec3>
where
    H: RoadNetwork + ?Sized,
{
    let center_planar = planar(center);
    let mut best: Option<(f32, Vec3)> = None;

    for lane in node.lanes.iter().filter_map(|id| host.lane(*id)) {
        if !lane.accepts_signs() {
            continue;
        }
        let (_, t) = lane.curve.closest_planar(center_planar);
        let point = lane.curve.position(t);
        let deviation = bearing_difference(target_angle, bearing_to_point(center_planar, planar(point)));
        if best.is_none_or(|(d, _)| deviation < d) {
            best = Some((deviation, point));
        }
    }

    best.map(|(_, point)| point)
}

// =============================================================================
// TESTS
// =============================================================================
