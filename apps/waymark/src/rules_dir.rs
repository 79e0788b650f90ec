//! # Rules Folder
//!
//! The folder of rule files behind the abbreviation engine.
//!
//! On first use the folder is created together with `_default.txt`, which only
//! documents the rule format. Other files may sit beside it; configuration
//! selects which one is active.

use crate::config::validate_rule_file_name;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use waymark_core::primitives::{DEFAULT_RULE_FILE_CONTENTS, DEFAULT_RULE_FILE_NAME};
use waymark_core::{AbbreviationEngine, LoadReport, WaymarkError};

/// Maximum size of a single rule file.
const MAX_RULE_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// A rules folder on disk.
#[derive(Debug, Clone)]
pub struct RulesDir {
    root: PathBuf,
}

impl RulesDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the folder and the default rule file if they are missing.
    ///
    /// Returns `true` when the default file was written.
    pub fn ensure(&self) -> Result<bool, WaymarkError> {
        std::fs::create_dir_all(&self.root)?;
        let default = self.root.join(DEFAULT_RULE_FILE_NAME);
        if default.exists() {
            return Ok(false);
        }
        std::fs::write(&default, DEFAULT_RULE_FILE_CONTENTS)?;
        tracing::info!(path = %default.display(), "created default rule file");
        Ok(true)
    }

    /// Path of a rule file inside the folder.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, WaymarkError> {
        validate_rule_file_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn read_rules(&self, name: &str) -> Result<String, WaymarkError> {
        let path = self.path_of(name)?;
        let size = std::fs::metadata(&path)?.len();
        if size > MAX_RULE_FILE_SIZE {
            return Err(WaymarkError::IoError(format!(
                "Rule file size {} bytes exceeds maximum allowed {} bytes",
                size, MAX_RULE_FILE_SIZE
            )));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn write_rules(&self, name: &str, text: &str) -> Result<(), WaymarkError> {
        let path = self.path_of(name)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Write `text` to a new `_exported-<unix seconds>.txt` file in the folder.
    ///
    /// An existing export of the same second is never overwritten; a counter
    /// is appended instead. Returns the path written.
    pub fn write_export(&self, text: &str) -> Result<PathBuf, WaymarkError> {
        std::fs::create_dir_all(&self.root)?;
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());

        let mut name = export_file_name(seconds, 0);
        let mut attempt = 0;
        while self.path_of(&name)?.exists() {
            attempt += 1;
            name = export_file_name(seconds, attempt);
        }
        self.write_rules(&name, text)?;
        self.path_of(&name)
    }

    /// Rule file names in the folder, sorted.
    pub fn list(&self) -> Result<Vec<String>, WaymarkError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load `name` into `engine`.
    ///
    /// A selected file that does not exist falls back to the default file.
    pub fn load_into(&self, engine: &AbbreviationEngine, name: &str) -> Result<LoadReport, WaymarkError> {
        self.ensure()?;
        let selected = if self.path_of(name)?.exists() {
            name
        } else {
            tracing::warn!(rule_file = name, "rule file not found, using defaults");
            DEFAULT_RULE_FILE_NAME
        };
        let text = self.read_rules(selected)?;
        let report = engine.load(&text);
        tracing::info!(
            rule_file = selected,
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "abbreviation rules loaded"
        );
        Ok(report)
    }
}

fn export_file_name(seconds: u64, attempt: u32) -> String {
    if attempt == 0 {
        format!("_exported-{seconds}.txt")
    } else {
        format!("_exported-{seconds}-{attempt}.txt")
    }
}
