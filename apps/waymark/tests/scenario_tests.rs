//! Integration tests for scenario files and the rules folder.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use tempfile::TempDir;
use waymark::{AppConfig, RulesDir, Scenario};
use waymark_core::{AbbreviationEngine, AddressResolver, QueryVars};

/// A cross at the origin: the main street runs east, a side street north,
/// and the plate stands on the north-east corner sidewalk.
const CORNER: &str = r#"
[[node]]
id = "corner"
position = [0.0, 0.0, 0.0]

[[node]]
id = "east"
position = [100.0, 0.0, 0.0]

[[node]]
id = "north"
position = [0.0, 0.0, 100.0]

[[edge]]
id = "main"
start = "corner"
end = "east"
road = 1
addresses = [0, 100]

[[edge]]
id = "side"
start = "corner"
end = "north"
road = 2
addresses = [0, 60]

[[lane]]
node = "corner"
from = [3.0, 0.0, 10.0]
to = [10.0, 0.0, 3.0]

[[object]]
id = "plate"
position = [5.0, 0.0, 5.0]
owner = "corner"
own = "main"
side = "side"

[[object]]
id = "loose"
position = [50.0, 0.0, 50.0]
"#;

fn targets(loaded: &waymark::LoadedScenario, names: &[&str]) -> Vec<(String, waymark_core::Entity)> {
    names
        .iter()
        .map(|name| (name.to_string(), loaded.object(name).unwrap()))
        .collect()
}

// =============================================================================
// SCENARIO RUNS
// =============================================================================

#[test]
fn test_corner_plate_resolves_after_one_cycle() {
    let loaded = Scenario::from_toml_str(CORNER).unwrap().build().unwrap();
    let mut resolver = AddressResolver::new();

    let outcomes = loaded.run(&mut resolver, &targets(&loaded, &["plate"]), &QueryVars::new(), 8);

    assert_eq!(outcomes.len(), 1);
    let resolution = outcomes[0].resolution.as_ref().unwrap();
    assert_eq!(resolution.number_text, "4 ~ 94");
    assert_eq!(outcomes[0].cycles, 1);
}

#[test]
fn test_side_target_reads_the_cross_street() {
    let loaded = Scenario::from_toml_str(CORNER).unwrap().build().unwrap();
    let mut resolver = AddressResolver::new();
    let vars = QueryVars::parse_pairs(["target=side", "separator=-"]);

    let outcomes = loaded.run(&mut resolver, &targets(&loaded, &["plate"]), &vars, 8);

    let resolution = outcomes[0].resolution.as_ref().unwrap();
    assert_eq!(resolution.number_text, "3-57");
}

#[test]
fn test_object_without_edges_stays_default() {
    let loaded = Scenario::from_toml_str(CORNER).unwrap().build().unwrap();
    let mut resolver = AddressResolver::new();

    let outcomes = loaded.run(
        &mut resolver,
        &targets(&loaded, &["plate", "loose"]),
        &QueryVars::new(),
        3,
    );

    assert!(outcomes[0].resolution.is_some());
    assert!(outcomes[1].resolution.is_none());
    assert_eq!(outcomes[1].cycles, 3);
    assert_eq!(resolver.cycle(), 3);
}

#[test]
fn test_scenario_file_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corner.toml");
    std::fs::write(&path, CORNER).unwrap();

    let loaded = Scenario::load(&path).unwrap().build().unwrap();
    assert_eq!(loaded.world.edge_count(), 2);
    assert_eq!(loaded.objects.len(), 2);
}

#[test]
fn test_unknown_scenario_key_is_rejected() {
    let text = format!("{CORNER}\n[[bridge]]\nid = \"x\"\n");
    assert!(Scenario::from_toml_str(&text).is_err());
}

// =============================================================================
// RULES FOLDER + RESOLVER
// =============================================================================

#[test]
fn test_rules_from_folder_shape_plate_text() {
    let dir = TempDir::new().unwrap();
    let rules = RulesDir::new(dir.path().join("rules"));
    rules.ensure().unwrap();
    rules
        .write_rules("plates.txt", "(\\d+) ~ (\\d+) = $1 to $2\n")
        .unwrap();

    let config = AppConfig {
        rules_dir: rules.root().to_path_buf(),
        rule_file: "plates.txt".to_string(),
        ..AppConfig::default()
    };
    let engine = config.engine();
    rules.load_into(&engine, &config.rule_file).unwrap();

    let loaded = Scenario::from_toml_str(CORNER).unwrap().build().unwrap();
    let mut resolver = AddressResolver::with_abbreviations(Arc::new(engine));
    let outcomes = loaded.run(&mut resolver, &targets(&loaded, &["plate"]), &QueryVars::new(), 8);

    assert_eq!(outcomes[0].resolution.as_ref().unwrap().number_text, "4 to 94");
}

#[test]
fn test_binary_rule_set_moves_between_engines() {
    let source = AbbreviationEngine::new();
    source.load("Street = St\n(?i)avenue = Ave\n");
    let bytes = source.to_bytes().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.bin");
    std::fs::write(&path, &bytes).unwrap();

    let target = AppConfig::default().engine();
    let loaded = target.load_bytes(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(target.apply("Fifth AVENUE and Main Street"), "Fifth Ave and Main St");
}
