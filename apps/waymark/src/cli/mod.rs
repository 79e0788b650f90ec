//! # Waymark CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create the configuration and the rules folder
//! - `apply` - Run texts through the active abbreviation rules
//! - `export` - Write the active rules in rule file format
//! - `pack` - Write the active rules as a binary rule set
//! - `unpack` - Convert a binary rule set back to rule text
//! - `watch` - Reload the rules whenever the active file changes
//! - `resolve` - Resolve street plates in a road scenario

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use waymark::AppConfig;
use waymark::config::DEFAULT_CONFIG_FILE;
use waymark_core::WaymarkError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Waymark - street plate toolkit
///
/// Resolves house number ranges for street plates and shortens their labels
/// with regex abbreviation rules.
#[derive(Parser, Debug)]
#[command(name = "waymark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Rules folder, overriding the configuration file
    #[arg(short = 'R', long, global = true)]
    pub rules_dir: Option<PathBuf>,

    /// Active rule file, overriding the configuration file
    #[arg(short = 'r', long, global = true)]
    pub rule_file: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the configuration file and the rules folder
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Abbreviate texts with the active rules
    Apply {
        /// Texts to abbreviate
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Export the active rules as rule text
    Export {
        /// Output file path (a timestamped file in the rules folder when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Write the active rules as a binary rule set
    Pack {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Read a binary rule set and print it as rule text
    Unpack {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Watch the rules folder and reload on change
    Watch {
        /// Text to abbreviate after every reload
        #[arg(short, long)]
        sample: Option<String>,
    },

    /// Resolve street plates in a TOML road scenario
    Resolve {
        /// Scenario file path
        #[arg(short, long)]
        scenario: PathBuf,

        /// Object id or handle (all objects when absent)
        #[arg(short, long)]
        object: Option<String>,

        /// Query variable as key=value (repeatable), e.g. target=side
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Synchronization cycles allowed, overriding the configuration file
        #[arg(long)]
        cycles: Option<u32>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Configuration file merged with the command line overrides.
    pub fn settings(&self) -> Result<AppConfig, WaymarkError> {
        let mut config = AppConfig::load(&self.config)?;
        if let Some(dir) = &self.rules_dir {
            config.rules_dir = dir.clone();
        }
        if let Some(file) = &self.rule_file {
            config.rule_file = file.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), WaymarkError> {
    let json_mode = cli.json_mode;

    if let Some(Commands::Init { force }) = cli.command {
        return cmd_init(&cli.config, cli.rules_dir.as_deref(), force, json_mode);
    }

    let config = cli.settings()?;

    match cli.command {
        Some(Commands::Init { .. }) => Ok(()),
        Some(Commands::Apply { texts }) => cmd_apply(&config, json_mode, &texts),
        Some(Commands::Export { output, stdout }) => {
            cmd_export(&config, json_mode, output.as_deref(), stdout)
        }
        Some(Commands::Pack { output }) => cmd_pack(&config, json_mode, &output),
        Some(Commands::Unpack { input, output }) => {
            cmd_unpack(&config, json_mode, &input, output.as_deref())
        }
        Some(Commands::Watch { sample }) => cmd_watch(&config, json_mode, sample.as_deref()),
        Some(Commands::Resolve {
            scenario,
            object,
            vars,
            cycles,
        }) => cmd_resolve(
            &config,
            json_mode,
            &scenario,
            object.as_deref(),
            &vars,
            cycles,
        ),
        None => {
            // No subcommand - show the rules folder by default
            cmd_status(&config, json_mode)
        }
    }
}
