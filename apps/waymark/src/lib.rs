//! # waymark
//!
//! File-facing side of the Waymark toolkit: configuration, the rules folder,
//! hot reload and road scenarios. The `waymark` binary is a thin CLI over
//! these modules and `waymark-core`.

pub mod config;
pub mod rules_dir;
pub mod scenario;
pub mod watcher;

pub use config::AppConfig;
pub use rules_dir::RulesDir;
pub use scenario::{LoadedScenario, Scenario};
pub use watcher::RuleWatcher;
