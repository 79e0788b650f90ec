//! # Validation Tier Tests (T0-T3)
//!
//! End-to-end behaviour of the resolver against an in-memory road world.
//!
//! ## Tiers
//! - T0: Deferred writes and synchronization
//! - T1: Street chains
//! - T2: Sign placement and staleness
//! - T3: Abbreviations and rule persistence

#![allow(clippy::panic)]

use glam::{Quat, Vec3};
use fixture::*;
use waymark_core::{
    AbbreviationEngine, AddressResolver, AggregateId, EdgeAddressRange, EdgeAddressing, Entity,
    PlacedObject, QueryVars, RoadWorld, WaymarkError,
};

/// Shared scenario builders.
mod fixture {
    use super::*;
    use waymark_core::{Bezier, Lane};

    /// A street of `len` edges along +X from the origin, all in one aggregate,
    /// crossed at the origin by a short side street running +Z.
    pub struct Street {
        pub world: RoadWorld,
        pub edges: Vec<Entity>,
        pub side: Entity,
        pub object: Entity,
    }

    pub fn street(len: usize, object_z: f32) -> Street {
        let mut world = RoadWorld::new();
        let road = Some(AggregateId(1));
        let nodes: Vec<Entity> = (0..=len)
            .map(|i| world.add_node(Vec3::new(i as f32 * 100.0, 0.0, 0.0)))
            .collect();
        let edges: Vec<Entity> = nodes
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let base = i as i32 * 100;
                world
                    .add_straight_edge(pair[0], pair[1], road, EdgeAddressing::new(base, base + 100))
                    .expect("edge")
            })
            .collect();

        let north = world.add_node(Vec3::new(0.0, 0.0, 100.0));
        let side = world
            .add_straight_edge(nodes[0], north, Some(AggregateId(2)), EdgeAddressing::new(0, 60))
            .expect("side edge");
        world
            .add_lane(
                nodes[0],
                Lane {
                    curve: Bezier::line(Vec3::new(3.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 3.0)),
                    pedestrian: true,
                    crosswalk: false,
                },
            )
            .expect("lane");

        let object = world
            .add_object(
                PlacedObject {
                    position: Vec3::new(5.0, 0.0, object_z),
                    rotation: Quat::IDENTITY,
                    owner: Some(nodes[0]),
                },
                Some(edges[0]),
                Some(side),
            )
            .expect("object");

        Street {
            world,
            edges,
            side,
            object,
        }
    }

    /// Query repeatedly, synchronizing in between, until the resolver answers.
    pub fn settle(resolver: &mut AddressResolver, s: &Street, vars: &QueryVars) -> (String, usize) {
        for cycle in 0..16 {
            if let Some(text) = resolver.number_range_text(&s.world, s.object, vars) {
                return (text, cycle);
            }
            resolver.synchronize(&s.world);
        }
        panic!("resolver never settled");
    }
}

// =============================================================================
// TIER T0: DEFERRED WRITES
// =============================================================================

mod t0_deferred_writes {
    use super::*;

    /// T0.1: Queries never write the store directly.
    #[test]
    fn queries_do_not_write_records() {
        let s = street(1, 5.0);
        let mut resolver = AddressResolver::new();

        let _ = resolver.resolve(&s.world, s.object, &QueryVars::new());
        assert_eq!(resolver.records().count::<EdgeAddressRange>(), 0);
    }

    /// T0.2: A synchronization with nothing to do changes nothing.
    #[test]
    fn idle_sync_is_a_no_op() {
        let s = street(1, 5.0);
        let mut resolver = AddressResolver::new();

        let report = resolver.synchronize(&s.world);
        assert_eq!(report.mutations_applied, 0);
        assert_eq!(report.edges_computed, 0);
        assert_eq!(report.cycle, 1);
    }

    /// T0.3: A cold plate needs exactly one synchronization.
    #[test]
    fn cold_plate_settles_after_one_cycle() {
        let s = street(1, 5.0);
        let mut resolver = AddressResolver::new();

        let (text, cycles) = settle(&mut resolver, &s, &QueryVars::new());
        assert_eq!(cycles, 1);
        assert_eq!(text, "4 ~ 94");
    }
}

// =============================================================================
// TIER T1: STREET CHAINS
// =============================================================================

mod t1_street_chains {
    use super::*;

    /// T1.1: The range spans every edge of the logical street.
    #[test]
    fn range_covers_the_whole_street() {
        let s = street(4, -5.0);
        let mut resolver = AddressResolver::new();

        let (text, _) = settle(&mut resolver, &s, &QueryVars::new());
        assert_eq!(text, "5 ~ 395");
    }

    /// T1.2: Every edge of the chain ends up cached.
    #[test]
    fn every_chain_edge_gets_a_record() {
        let s = street(3, 5.0);
        let mut resolver = AddressResolver::new();

        settle(&mut resolver, &s, &QueryVars::new());
        for edge in &s.edges {
            assert!(resolver.records().contains::<EdgeAddressRange>(*edge));
        }
    }

    /// T1.3: The side street is its own chain.
    #[test]
    fn side_street_is_independent() {
        let s = street(3, 5.0);
        let mut resolver = AddressResolver::new();
        let vars = QueryVars::new().with("target", "side");

        let (text, _) = settle(&mut resolver, &s, &vars);
        assert_eq!(text, "3 ~ 57");
        assert!(resolver.records().contains::<EdgeAddressRange>(s.side));
    }
}

// =============================================================================
// TIER T2: PLACEMENT AND STALENESS
// =============================================================================

mod t2_placement {
    use super::*;

    /// T2.1: Inverted and separator options shape the text.
    #[test]
    fn formatting_options_apply() {
        let s = street(1, 5.0);
        let mut resolver = AddressResolver::new();
        settle(&mut resolver, &s, &QueryVars::new());

        let vars = QueryVars::new().with("inverted", "1").with("separator", " / ");
        let text = resolver
            .number_range_text(&s.world, s.object, &vars)
            .expect("text");
        assert_eq!(text, "94 / 4");
    }

    /// T2.2: Renumbering an edge of a cached plate is picked up.
    #[test]
    fn renumbered_edge_refreshes_the_plate() {
        let mut s = street(1, 5.0);
        let mut resolver = AddressResolver::new();
        settle(&mut resolver, &s, &QueryVars::new());
        resolver.synchronize(&s.world);

        s.world
            .set_addressing(s.edges[0], EdgeAddressing::new(200, 300))
            .expect("renumber");

        let (text, cycles) = settle(&mut resolver, &s, &QueryVars::new());
        assert_eq!(cycles, 1);
        assert_eq!(text, "204 ~ 294");
    }

    /// T2.3: Touching an edge without renumbering recomputes the same numbers.
    #[test]
    fn touched_edge_recomputes_same_numbers() {
        let mut s = street(1, 5.0);
        let mut resolver = AddressResolver::new();
        let vars = QueryVars::new().with("target", "side");
        let (before, _) = settle(&mut resolver, &s, &vars);
        resolver.synchronize(&s.world);

        s.world.touch_edge(s.side).expect("touch");
        let (after, cycles) = settle(&mut resolver, &s, &vars);
        assert_eq!(cycles, 1);
        assert_eq!(before, after);
    }

    /// T2.4: Renumbering an edge in the middle of the chain is picked up.
    #[test]
    fn renumbered_middle_edge_refreshes_the_plate() {
        let mut s = street(3, 5.0);
        let mut resolver = AddressResolver::new();
        let (text, _) = settle(&mut resolver, &s, &QueryVars::new());
        assert_eq!(text, "4 ~ 294");
        resolver.synchronize(&s.world);

        s.world
            .set_addressing(s.edges[1], EdgeAddressing::new(100, 700))
            .expect("renumber");

        let (text, cycles) = settle(&mut resolver, &s, &QueryVars::new());
        assert_eq!(cycles, 1);
        assert_eq!(text, "4 ~ 670");
        let range = resolver
            .records()
            .get::<EdgeAddressRange>(s.edges[1])
            .expect("range");
        assert_eq!((range.min_number, range.max_number), (130, 670));
    }

    /// T2.5: Unknown objects resolve to the default.
    #[test]
    fn unknown_object_is_absent() {
        let s = street(1, 5.0);
        let mut resolver = AddressResolver::new();
        assert!(resolver
            .resolve(&s.world, Entity(9_999), &QueryVars::new())
            .is_none());
    }
}

// =============================================================================
// TIER T3: ABBREVIATIONS
// =============================================================================

mod t3_abbreviations {
    use super::*;
    use std::sync::Arc;

    /// T3.1: A reload shared with the resolver takes effect on the next query.
    #[test]
    fn shared_engine_reload_is_visible() {
        let s = street(1, 5.0);
        let engine = Arc::new(AbbreviationEngine::new());
        let mut resolver = AddressResolver::with_abbreviations(Arc::clone(&engine));
        let vars = QueryVars::new();

        let (text, _) = settle(&mut resolver, &s, &vars);
        assert_eq!(text, "4 ~ 94");

        engine.reload(r"(\d+) ~ (\d+) = $1-$2");
        let text = resolver
            .number_range_text(&s.world, s.object, &vars)
            .expect("text");
        assert_eq!(text, "4-94");
    }

    /// T3.2: Literal and case-insensitive rules rewrite whole words only.
    #[test]
    fn word_rules_rewrite_street_names() {
        let engine = AbbreviationEngine::new();
        let report = engine.load("Street = St\n(?i)avenue=Ave");
        assert_eq!(report.loaded, 2);

        assert_eq!(engine.apply("Main Street"), "Main St");
        assert_eq!(engine.apply("Grand AVENUE"), "Grand Ave");
        assert_eq!(engine.apply("Streetwise"), "Streetwise");
    }

    /// T3.3: A newer binary rule set is refused.
    #[test]
    fn newer_rule_set_is_refused() {
        let engine = AbbreviationEngine::new();
        engine.load("Street = St");
        let mut bytes = engine.to_bytes().expect("encode");
        bytes[0..4].copy_from_slice(&1u32.to_le_bytes());

        let fresh = AbbreviationEngine::new();
        let result = fresh.load_bytes(&bytes);
        assert!(matches!(
            result,
            Err(WaymarkError::IncompatibleVersion { found: 1, supported: 0 })
        ));
        assert!(fresh.is_empty());
    }
}
