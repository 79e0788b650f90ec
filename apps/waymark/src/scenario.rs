//! # Road Scenarios
//!
//! A road network described in TOML, for running the resolver outside a host.
//!
//! ```toml
//! [[node]]
//! id = "corner"
//! position = [0.0, 0.0, 0.0]
//!
//! [[edge]]
//! id = "main-1"
//! start = "corner"
//! end = "east"
//! road = 1
//! addresses = [0, 100]
//!
//! [[lane]]
//! node = "corner"
//! from = [3.0, 0.0, 10.0]
//! to = [10.0, 0.0, 3.0]
//!
//! [[object]]
//! id = "plate"
//! position = [5.0, 0.0, 5.0]
//! owner = "corner"
//! own = "main-1"
//! side = "north-1"
//! ```
//!
//! Ids are free-form strings; they are mapped to world handles on build.

use glam::{Quat, Vec3};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use waymark_core::{
    AddressResolver, AggregateId, Bezier, EdgeAddressing, Entity, Lane, PlacedObject, QueryVars,
    RoadNetwork, RoadWorld, SignResolution, WaymarkError,
};

/// Maximum size of a scenario file.
const MAX_SCENARIO_FILE_SIZE: u64 = 16 * 1024 * 1024;

// =============================================================================
// FILE FORMAT
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeSpec {
    id: String,
    position: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeSpec {
    id: String,
    start: String,
    end: String,
    #[serde(default)]
    road: Option<u64>,
    addresses: [i32; 2],
    /// Inner control points; a straight line when absent.
    #[serde(default)]
    controls: Option<[[f32; 3]; 2]>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct LaneSpec {
    node: String,
    from: [f32; 3],
    to: [f32; 3],
    #[serde(default = "default_true")]
    pedestrian: bool,
    #[serde(default)]
    crosswalk: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectSpec {
    id: String,
    position: [f32; 3],
    /// Rotation about the vertical axis, in degrees.
    #[serde(default)]
    yaw: f32,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    own: Option<String>,
    #[serde(default)]
    side: Option<String>,
}

/// Parsed scenario file, not yet checked for dangling ids.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default, rename = "node")]
    nodes: Vec<NodeSpec>,
    #[serde(default, rename = "edge")]
    edges: Vec<EdgeSpec>,
    #[serde(default, rename = "lane")]
    lanes: Vec<LaneSpec>,
    #[serde(default, rename = "object")]
    objects: Vec<ObjectSpec>,
}

/// A built world plus the id mapping of its objects.
#[derive(Debug)]
pub struct LoadedScenario {
    pub world: RoadWorld,
    /// Scenario object ids to world handles, in id order.
    pub objects: BTreeMap<String, Entity>,
    pub edges: BTreeMap<String, Entity>,
}

/// What one plate showed after a scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateOutcome {
    pub name: String,
    pub object: Entity,
    /// `None` when the plate still showed its default after the last cycle.
    pub resolution: Option<SignResolution>,
    /// Synchronizations that ran before the plate resolved.
    pub cycles: u32,
}

impl LoadedScenario {
    /// Resolve an object by scenario id, or by raw handle number.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Entity> {
        self.objects
            .get(key)
            .copied()
            .or_else(|| key.parse::<u64>().ok().map(Entity))
    }

    /// Query every target, synchronizing between rounds, the way a host
    /// frame loop would. Stops once all plates resolved or after `max_cycles`
    /// synchronizations.
    pub fn run(
        &self,
        resolver: &mut AddressResolver,
        targets: &[(String, Entity)],
        vars: &QueryVars,
        max_cycles: u32,
    ) -> Vec<PlateOutcome> {
        let mut outcomes: Vec<PlateOutcome> = targets
            .iter()
            .map(|(name, object)| PlateOutcome {
                name: name.clone(),
                object: *object,
                resolution: None,
                cycles: 0,
            })
            .collect();

        for cycle in 0..=max_cycles {
            for outcome in outcomes.iter_mut().filter(|o| o.resolution.is_none()) {
                outcome.resolution = resolver.resolve(&self.world, outcome.object, vars);
                outcome.cycles = cycle;
            }
            if outcomes.iter().all(|o| o.resolution.is_some()) || cycle == max_cycles {
                break;
            }
            resolver.synchronize(&self.world);
        }

        let pending = outcomes.iter().filter(|o| o.resolution.is_none()).count();
        if pending > 0 {
            tracing::warn!(pending, max_cycles, "plates left unresolved");
        }
        outcomes
    }
}

// =============================================================================
// BUILD
// =============================================================================

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self, WaymarkError> {
        toml::from_str(text).map_err(|e| WaymarkError::ScenarioError(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, WaymarkError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_SCENARIO_FILE_SIZE {
            return Err(WaymarkError::ScenarioError(format!(
                "Scenario file size {} bytes exceeds maximum allowed {} bytes",
                size, MAX_SCENARIO_FILE_SIZE
            )));
        }
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Build the world. Nodes first, then edges, lanes and objects.
    pub fn build(&self) -> Result<LoadedScenario, WaymarkError> {
        let mut world = RoadWorld::new();

        let mut nodes = BTreeMap::new();
        for spec in &self.nodes {
            let id = world.add_node(Vec3::from_array(spec.position));
            if nodes.insert(spec.id.clone(), id).is_some() {
                return Err(duplicate("node", &spec.id));
            }
        }

        let mut edges = BTreeMap::new();
        for spec in &self.edges {
            let start = lookup(&nodes, "node", &spec.start)?;
            let end = lookup(&nodes, "node", &spec.end)?;
            let addressing = EdgeAddressing::new(spec.addresses[0], spec.addresses[1]);
            let road = spec.road.map(AggregateId);
            let id = match spec.controls {
                Some([b, c]) => {
                    let curve = Bezier::new(
                        node_position(&world, start)?,
                        Vec3::from_array(b),
                        Vec3::from_array(c),
                        node_position(&world, end)?,
                    );
                    world.add_edge(start, end, curve, road, addressing)?
                }
                None => world.add_straight_edge(start, end, road, addressing)?,
            };
            if edges.insert(spec.id.clone(), id).is_some() {
                return Err(duplicate("edge", &spec.id));
            }
        }

        for spec in &self.lanes {
            let node = lookup(&nodes, "node", &spec.node)?;
            world.add_lane(
                node,
                Lane {
                    curve: Bezier::line(Vec3::from_array(spec.from), Vec3::from_array(spec.to)),
                    pedestrian: spec.pedestrian,
                    crosswalk: spec.crosswalk,
                },
            )?;
        }

        let mut objects = BTreeMap::new();
        for spec in &self.objects {
            let owner = spec
                .owner
                .as_deref()
                .map(|key| lookup(&nodes, "node", key))
                .transpose()?;
            let own = spec
                .own
                .as_deref()
                .map(|key| lookup(&edges, "edge", key))
                .transpose()?;
            let side = spec
                .side
                .as_deref()
                .map(|key| lookup(&edges, "edge", key))
                .transpose()?;
            let object = PlacedObject {
                position: Vec3::from_array(spec.position),
                rotation: Quat::from_rotation_y(spec.yaw.to_radians()),
                owner,
            };
            let id = world.add_object(object, own, side)?;
            if objects.insert(spec.id.clone(), id).is_some() {
                return Err(duplicate("object", &spec.id));
            }
        }

        tracing::debug!(
            nodes = world.node_count(),
            edges = world.edge_count(),
            objects = objects.len(),
            "scenario built"
        );

        Ok(LoadedScenario {
            world,
            objects,
            edges,
        })
    }
}

fn lookup(map: &BTreeMap<String, Entity>, kind: &str, key: &str) -> Result<Entity, WaymarkError> {
    map.get(key)
        .copied()
        .ok_or_else(|| WaymarkError::ScenarioError(format!("unknown {kind} '{key}'")))
}

fn node_position(world: &RoadWorld, node: Entity) -> Result<Vec3, WaymarkError> {
    world
        .node(node)
        .map(|entry| entry.position)
        .ok_or_else(|| WaymarkError::ScenarioError(format!("unknown node {node}")))
}

fn duplicate(kind: &str, key: &str) -> WaymarkError {
    WaymarkError::ScenarioError(format!("duplicate {kind} id '{key}'"))
}
