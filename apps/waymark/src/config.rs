//! # Configuration
//!
//! `waymark.toml`, read with `toml` + `serde`.
//!
//! ```toml
//! rules_dir = "rules"
//! rule_file = "_default.txt"
//! match_timeout_ms = 100
//! separator = " ~ "
//! max_cycles = 8
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use waymark_core::primitives::{
    DEFAULT_MATCH_TIMEOUT, DEFAULT_RANGE_SEPARATOR, DEFAULT_RULE_FILE_NAME,
};
use waymark_core::{AbbreviationEngine, RegexCompiler, WaymarkError};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "waymark.toml";

/// Maximum size of a configuration file.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Upper bound for the per-rule match timeout.
const MAX_MATCH_TIMEOUT_MS: u64 = 60_000;

/// Upper bound for scenario synchronization cycles.
const MAX_CYCLES: u32 = 1_000;

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Folder holding rule files.
    pub rules_dir: PathBuf,
    /// Active rule file inside `rules_dir`.
    pub rule_file: String,
    /// Time budget for one rule on one text.
    pub match_timeout_ms: u64,
    /// Range separator used when a query does not set one.
    pub separator: String,
    /// Synchronization cycles a scenario run may take before giving up.
    pub max_cycles: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("rules"),
            rule_file: DEFAULT_RULE_FILE_NAME.to_string(),
            match_timeout_ms: DEFAULT_MATCH_TIMEOUT.as_millis() as u64,
            separator: DEFAULT_RANGE_SEPARATOR.to_string(),
            max_cycles: 8,
        }
    }
}

impl AppConfig {
    /// Read `path`, or return defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, WaymarkError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let size = std::fs::metadata(path)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(WaymarkError::ConfigError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                size, MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, WaymarkError> {
        let config: Self =
            toml::from_str(text).map_err(|e| WaymarkError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, WaymarkError> {
        toml::to_string(self).map_err(|e| WaymarkError::ConfigError(e.to_string()))
    }

    /// Reject values the rest of the app cannot work with.
    pub fn validate(&self) -> Result<(), WaymarkError> {
        validate_rule_file_name(&self.rule_file)?;
        if self.match_timeout_ms == 0 || self.match_timeout_ms > MAX_MATCH_TIMEOUT_MS {
            return Err(WaymarkError::ConfigError(format!(
                "match_timeout_ms must be between 1 and {}",
                MAX_MATCH_TIMEOUT_MS
            )));
        }
        if self.max_cycles == 0 || self.max_cycles > MAX_CYCLES {
            return Err(WaymarkError::ConfigError(format!(
                "max_cycles must be between 1 and {}",
                MAX_CYCLES
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn match_timeout(&self) -> Duration {
        Duration::from_millis(self.match_timeout_ms)
    }

    /// A rule engine using the configured match timeout.
    #[must_use]
    pub fn engine(&self) -> AbbreviationEngine {
        AbbreviationEngine::with_compiler(RegexCompiler::with_timeout(self.match_timeout()))
    }
}

/// Rule files are plain names inside the rules folder, never paths.
pub fn validate_rule_file_name(name: &str) -> Result<(), WaymarkError> {
    let is_plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if !is_plain {
        return Err(WaymarkError::ConfigError(format!(
            "Invalid rule file name '{}': must be a plain file name",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.rule_file, "_default.txt");
        assert_eq!(config.match_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_overrides_only_its_keys() {
        let config = AppConfig::from_toml_str("separator = \" - \"\nmax_cycles = 3\n").expect("parse");
        assert_eq!(config.separator, " - ");
        assert_eq!(config.max_cycles, 3);
        assert_eq!(config.rules_dir, PathBuf::from("rules"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AppConfig::from_toml_str("colour = \"red\"").is_err());
    }

    #[test]
    fn rule_file_must_not_be_a_path() {
        assert!(AppConfig::from_toml_str("rule_file = \"../etc/passwd\"").is_err());
        assert!(validate_rule_file_name("streets.txt").is_ok());
        assert!(validate_rule_file_name("..").is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(AppConfig::from_toml_str("match_timeout_ms = 0").is_err());
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = AppConfig {
            separator: "/".to_string(),
            ..AppConfig::default()
        };
        let text = config.to_toml_string().expect("serialize");
        assert_eq!(AppConfig::from_toml_str(&text).expect("parse"), config);
    }
}
