//! # waymark-core
//!
//! Street plate resolution for a city-building host - THE LOGIC.
//!
//! This crate turns a road graph into what a street plate shows: the house
//! number range of the adjoining streets, the angle of each street relative to
//! the plate and the spot on the corner sidewalk where the plate stands. Text
//! goes through a hot-reloadable abbreviation engine before it is displayed.
//!
//! ## Architecture
//!
//! - The host owns the road data and exposes it through the traits in [`bridge`]
//! - Derived data lives in a [`RecordStore`] and is only written at
//!   synchronization points through the [`MutationQueue`]
//! - Queries never block: missing data yields `None` and is computed later
//!
//! ## Constraints
//!
//! - No async, no network, no file I/O (the app layer does that)
//! - Deterministic iteration order (`BTreeMap`/`BTreeSet` everywhere)

// =============================================================================
// MODULES
// =============================================================================

pub mod abbreviation;
pub mod bridge;
pub mod edge_range;
pub mod formats;
pub mod geometry;
pub mod mutation;
pub mod network;
pub mod placement;
pub mod primitives;
pub mod query;
pub mod resolver;
pub mod store;
pub mod types;
pub mod walk;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AggregateId, Entity, VersionToken, WaymarkError};

// =============================================================================
// RE-EXPORTS: Resolver
// =============================================================================

pub use bridge::{
    AddressSource, Lane, PlacedObject, RoadBridge, RoadEdge, RoadHost, RoadNetwork, RoadNode,
    SegmentRef,
};
pub use edge_range::{EdgeAddressRange, EdgeRangeCache, RangeLookup};
pub use geometry::Bezier;
pub use mutation::MutationQueue;
pub use network::{EdgeAddressing, RoadWorld};
pub use placement::{SidePlacement, SignPlacementCache, StreetNumberRange};
pub use query::{QueryVars, SegmentTarget};
pub use resolver::{AddressResolver, SignResolution, SyncReport};
pub use store::{Record, RecordStore};
pub use walk::ChainRange;

// =============================================================================
// RE-EXPORTS: Abbreviations and Formats
// =============================================================================

pub use abbreviation::{AbbreviationEngine, AbbreviationRule, LoadReport, RegexCompiler, SkippedLine};
pub use formats::{RuleSetHeader, rules_from_bytes, rules_to_bytes};
