//! # Rule File Watcher
//!
//! Watches the rules folder with `notify` and reloads the engine when the
//! active rule file changes.

use crate::rules_dir::RulesDir;
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::time::Duration;
use waymark_core::{AbbreviationEngine, LoadReport, WaymarkError};

pub struct RuleWatcher {
    rx: Receiver<notify::Result<Event>>,
    file_name: String,
    _watcher: notify::RecommendedWatcher,
}

impl RuleWatcher {
    /// Start watching `rules_dir` for changes to `file_name`.
    pub fn new(rules_dir: &Path, file_name: &str) -> Result<Self, WaymarkError> {
        let (tx, rx) = channel();

        let mut watcher = recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(watch_error)?;

        watcher
            .watch(rules_dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
        tracing::debug!(path = %rules_dir.display(), file = file_name, "watching rules folder");

        Ok(Self {
            rx,
            file_name: file_name.to_string(),
            _watcher: watcher,
        })
    }

    /// Drain pending events; `true` if any of them touched the active file.
    pub fn take_active_changes(&self) -> bool {
        let mut changed = false;
        while let Ok(res) = self.rx.try_recv() {
            changed |= self.is_relevant(res);
        }
        changed
    }

    /// Block up to `timeout` for a change to the active file.
    ///
    /// Events arriving in the same burst are drained so one edit reloads once.
    pub fn wait_for_change(&self, timeout: Duration) -> Result<bool, WaymarkError> {
        match self.rx.recv_timeout(timeout) {
            Ok(res) => {
                let first = self.is_relevant(res);
                Ok(self.take_active_changes() || first)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                Err(WaymarkError::IoError("rule watcher stopped".to_string()))
            }
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn is_relevant(&self, res: notify::Result<Event>) -> bool {
        match res {
            Ok(event) => touches(&event, &self.file_name),
            Err(e) => {
                tracing::warn!(error = %e, "rule watcher error");
                false
            }
        }
    }
}

/// Re-read the active file and swap it into the engine.
///
/// A file removed mid-edit keeps the current rules.
pub fn reload_active(
    rules: &RulesDir,
    engine: &AbbreviationEngine,
    file_name: &str,
) -> Result<LoadReport, WaymarkError> {
    let path = rules.path_of(file_name)?;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "active rule file vanished, keeping current rules");
        return Ok(LoadReport {
            loaded: engine.len(),
            skipped: Vec::new(),
        });
    }
    let text = rules.read_rules(file_name)?;
    Ok(engine.reload(&text))
}

/// Whether `event` is a content change of a file named `file_name`.
#[must_use]
pub fn touches(event: &Event, file_name: &str) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.file_name().and_then(|name| name.to_str()) == Some(file_name))
}

fn watch_error(e: notify::Error) -> WaymarkError {
    WaymarkError::IoError(format!("watch failed: {e}"))
}
