//! # Waymark
//!
//! Command line front end for street plate resolution and label abbreviation.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 apps/waymark (THE BINARY)             │
//! │                                                       │
//! │  ┌───────────┐   ┌─────────────┐   ┌──────────────┐   │
//! │  │   CLI     │   │ Rules folder│   │  Scenarios   │   │
//! │  │  (clap)   │   │  (notify)   │   │   (toml)     │   │
//! │  └─────┬─────┘   └──────┬──────┘   └──────┬───────┘   │
//! │        └────────────────┼─────────────────┘           │
//! │                         ▼                             │
//! │                 ┌───────────────┐                     │
//! │                 │ waymark-core  │                     │
//! │                 │  (THE LOGIC)  │                     │
//! │                 └───────────────┘                     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! waymark init
//! waymark apply "North Main Street"
//! waymark resolve -s corner.toml -o plate --var inverted --var separator=" - "
//! waymark watch --sample "Main Street"
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // WAYMARK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("WAYMARK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "waymark=debug,waymark_core=debug"
    } else {
        "waymark=info,waymark_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    eprintln!("Waymark v{}", env!("CARGO_PKG_VERSION"));
}
