//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use waymark::scenario::PlateOutcome;
use waymark::watcher::reload_active;
use waymark::{AppConfig, RuleWatcher, RulesDir, Scenario};
use waymark_core::primitives::VAR_SEPARATOR;
use waymark_core::{AbbreviationEngine, AddressResolver, LoadReport, QueryVars, WaymarkError};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for binary rule sets (16 MB).
const MAX_RULESET_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// How long `watch` blocks before checking the channel again.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), WaymarkError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| WaymarkError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(WaymarkError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, WaymarkError> {
    let canonical = path.canonicalize().map_err(|e| {
        WaymarkError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(WaymarkError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path; the file itself may not exist yet.
fn validate_output_path(path: &Path) -> Result<PathBuf, WaymarkError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        WaymarkError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(WaymarkError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| WaymarkError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn report_json(report: &LoadReport) -> serde_json::Value {
    serde_json::json!({
        "loaded": report.loaded,
        "skipped": report.skipped.iter().map(|s| serde_json::json!({
            "line": s.line,
            "text": s.text,
            "reason": s.reason,
        })).collect::<Vec<_>>(),
    })
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write a default configuration and create the rules folder.
pub fn cmd_init(
    config_path: &Path,
    rules_dir: Option<&Path>,
    force: bool,
    json_mode: bool,
) -> Result<(), WaymarkError> {
    if config_path.exists() && !force {
        return Err(WaymarkError::ConfigError(
            "Configuration already exists. Use --force to overwrite.".to_string(),
        ));
    }

    let mut config = AppConfig::default();
    if let Some(dir) = rules_dir {
        config.rules_dir = dir.to_path_buf();
    }
    let config_path = validate_output_path(config_path)?;
    std::fs::write(&config_path, config.to_toml_string()?)?;

    let rules = RulesDir::new(&config.rules_dir);
    let created = rules.ensure()?;

    if json_mode {
        print_json(&serde_json::json!({
            "config": config_path.to_string_lossy(),
            "rules_dir": config.rules_dir.to_string_lossy(),
            "default_rule_file_created": created,
        }));
        return Ok(());
    }

    println!("Wrote configuration to {}", config_path.display());
    println!("Rules folder: {}", config.rules_dir.display());
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show the rules folder and the active rule file.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), WaymarkError> {
    let (rules, engine) = open_rules(config)?;
    let files = rules.list()?;

    if json_mode {
        print_json(&serde_json::json!({
            "rules_dir": rules.root().to_string_lossy(),
            "rule_file": config.rule_file,
            "rule_files": files,
            "rule_count": engine.len(),
            "match_timeout_ms": config.match_timeout_ms,
        }));
        return Ok(());
    }

    println!("Waymark Status");
    println!("==============");
    println!("Rules folder:  {}", rules.root().display());
    println!("Active file:   {}", config.rule_file);
    println!("Active rules:  {}", engine.len());
    println!("Match timeout: {} ms", config.match_timeout_ms);
    println!();
    println!("Rule files:");
    for file in files {
        println!("  {}", file);
    }
    Ok(())
}

// =============================================================================
// APPLY COMMAND
// =============================================================================

/// Abbreviate each text with the active rules.
pub fn cmd_apply(config: &AppConfig, json_mode: bool, texts: &[String]) -> Result<(), WaymarkError> {
    let (_, engine) = open_rules(config)?;

    if json_mode {
        let results: Vec<_> = texts
            .iter()
            .map(|text| serde_json::json!({ "input": text, "output": engine.apply(text) }))
            .collect();
        print_json(&serde_json::json!({ "results": results }));
        return Ok(());
    }

    for text in texts {
        println!("{}", engine.apply(text));
    }
    Ok(())
}

// =============================================================================
// EXPORT / PACK / UNPACK COMMANDS
// =============================================================================

/// Write the active rules in rule file format.
///
/// Without an output path the rules land in a timestamped file inside the
/// rules folder.
pub fn cmd_export(
    config: &AppConfig,
    json_mode: bool,
    output: Option<&Path>,
    stdout: bool,
) -> Result<(), WaymarkError> {
    let (rules, engine) = open_rules(config)?;
    let text = engine.export();
    if stdout || output.is_some() {
        return write_text_or_stdout(&text, output);
    }

    let path = rules.write_export(&text)?;
    tracing::info!(path = %path.display(), rules = engine.len(), "rules exported");
    if json_mode {
        print_json(&serde_json::json!({
            "output": path.to_string_lossy(),
            "rules": engine.len(),
        }));
    } else {
        println!("Exported {} rules to {}", engine.len(), path.display());
    }
    Ok(())
}

/// Write the active rules as a binary rule set.
pub fn cmd_pack(config: &AppConfig, json_mode: bool, output: &Path) -> Result<(), WaymarkError> {
    let (_, engine) = open_rules(config)?;
    let bytes = engine.to_bytes()?;
    let output = validate_output_path(output)?;
    std::fs::write(&output, &bytes)?;

    tracing::info!(rules = engine.len(), bytes = bytes.len(), "rule set packed");
    if json_mode {
        print_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "rules": engine.len(),
            "bytes": bytes.len(),
        }));
    } else {
        println!("Packed {} rules into {}", engine.len(), output.display());
    }
    Ok(())
}

/// Decode a binary rule set and print it as rule text.
pub fn cmd_unpack(
    config: &AppConfig,
    json_mode: bool,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), WaymarkError> {
    let input = validate_file_path(input)?;
    validate_file_size(&input, MAX_RULESET_FILE_SIZE)?;
    let bytes = std::fs::read(&input)?;

    let engine = config.engine();
    let loaded = engine.load_bytes(&bytes)?;

    if json_mode && output.is_none() {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "rules": engine.rules(),
            "loaded": loaded,
        }));
        return Ok(());
    }
    write_text_or_stdout(&engine.export(), output)
}

fn write_text_or_stdout(text: &str, output: Option<&Path>) -> Result<(), WaymarkError> {
    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, text)?;
            tracing::info!(path = %path.display(), "rules written");
        }
        None => print!("{}", text),
    }
    Ok(())
}

// =============================================================================
// WATCH COMMAND
// =============================================================================

/// Reload the active rule file whenever it changes. Runs until interrupted.
pub fn cmd_watch(config: &AppConfig, json_mode: bool, sample: Option<&str>) -> Result<(), WaymarkError> {
    let (rules, engine) = open_rules(config)?;
    let watcher = RuleWatcher::new(rules.root(), &config.rule_file)?;

    if !json_mode {
        println!(
            "Watching {} (Ctrl+C to stop)",
            rules.root().join(watcher.file_name()).display()
        );
    }
    print_sample(&engine, sample, json_mode, None);

    loop {
        if !watcher.wait_for_change(WATCH_POLL_INTERVAL)? {
            continue;
        }
        let report = reload_active(&rules, &engine, watcher.file_name())?;
        print_sample(&engine, sample, json_mode, Some(&report));
    }
}

fn print_sample(engine: &AbbreviationEngine, sample: Option<&str>, json_mode: bool, report: Option<&LoadReport>) {
    let output = sample.map(|text| engine.apply(text));
    if json_mode {
        print_json(&serde_json::json!({
            "rules": engine.len(),
            "report": report.map(report_json),
            "sample": sample,
            "output": output,
        }));
        return;
    }
    if let Some(report) = report {
        println!("Reloaded: {} rules, {} skipped", report.loaded, report.skipped.len());
        for skipped in &report.skipped {
            println!("  line {}: {} ({})", skipped.line, skipped.text, skipped.reason);
        }
    }
    if let (Some(sample), Some(output)) = (sample, output) {
        println!("{} -> {}", sample, output);
    }
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Resolve the plates of a scenario file.
pub fn cmd_resolve(
    config: &AppConfig,
    json_mode: bool,
    scenario: &Path,
    object: Option<&str>,
    vars: &[String],
    cycles: Option<u32>,
) -> Result<(), WaymarkError> {
    let scenario = validate_file_path(scenario)?;
    let loaded = Scenario::load(&scenario)?.build()?;
    let (_, engine) = open_rules(config)?;

    let mut vars = QueryVars::parse_pairs(vars.iter().map(String::as_str));
    if !vars.contains(VAR_SEPARATOR) {
        vars.insert(VAR_SEPARATOR, config.separator.as_str());
    }

    let targets: Vec<(String, waymark_core::Entity)> = match object {
        Some(key) => {
            let entity = loaded.object(key).ok_or_else(|| {
                WaymarkError::ScenarioError(format!("unknown object '{}'", key))
            })?;
            vec![(key.to_string(), entity)]
        }
        None => loaded
            .objects
            .iter()
            .map(|(name, entity)| (name.clone(), *entity))
            .collect(),
    };

    let mut resolver = AddressResolver::with_abbreviations(Arc::new(engine));
    let max_cycles = cycles.unwrap_or(config.max_cycles);
    let outcomes = loaded.run(&mut resolver, &targets, &vars, max_cycles);

    if json_mode {
        let plates: Vec<_> = outcomes.iter().map(outcome_json).collect();
        print_json(&serde_json::json!({
            "cycles": resolver.cycle(),
            "plates": plates,
        }));
        return Ok(());
    }

    for outcome in &outcomes {
        match &outcome.resolution {
            Some(resolution) => println!(
                "{}: {}  angle {:.1}  offset ({:.2}, {:.2}, {:.2})",
                outcome.name,
                resolution.number_text,
                resolution.direction_angle.y,
                resolution.offset_position.x,
                resolution.offset_position.y,
                resolution.offset_position.z,
            ),
            None => println!("{}: (default after {} cycles)", outcome.name, outcome.cycles),
        }
    }
    Ok(())
}

fn outcome_json(outcome: &PlateOutcome) -> serde_json::Value {
    match &outcome.resolution {
        Some(resolution) => serde_json::json!({
            "object": outcome.name,
            "entity": outcome.object.raw(),
            "cycles": outcome.cycles,
            "text": resolution.number_text,
            "min_number": resolution.number_range.min_number,
            "max_number": resolution.number_range.max_number,
            "node_is_min_end": resolution.number_range.node_is_min_end,
            "direction_angle": resolution.direction_angle.to_array(),
            "offset_position": resolution.offset_position.to_array(),
        }),
        None => serde_json::json!({
            "object": outcome.name,
            "entity": outcome.object.raw(),
            "cycles": outcome.cycles,
            "text": serde_json::Value::Null,
        }),
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the rules folder and load the active rule file into a new engine.
pub fn open_rules(config: &AppConfig) -> Result<(RulesDir, AbbreviationEngine), WaymarkError> {
    let rules = RulesDir::new(&config.rules_dir);
    let engine = config.engine();
    rules.load_into(&engine, &config.rule_file)?;
    Ok((rules, engine))
}
