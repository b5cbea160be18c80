// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ripple - a multi-protocol chat relay.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod import;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ripple_config::RippleConfig;

/// Ripple - a multi-protocol chat relay.
#[derive(Parser, Debug)]
#[command(name = "ripple", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay with every configured adapter.
    Serve,
    /// Merge JSON-lines message logs into the store.
    Import {
        /// Log files, one per source protocol.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Maximum seconds between two records of the same message.
        #[arg(long, default_value_t = 4)]
        slack: i64,
        /// Protocols from most to least trusted, comma separated.
        #[arg(long, value_delimiter = ',')]
        priority: Vec<String>,
    },
}

fn load_config(path: Option<&std::path::Path>) -> RippleConfig {
    let loaded = match path {
        Some(path) => ripple_config::load_and_validate_path(path),
        None => ripple_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            ripple_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Import {
            files,
            slack,
            priority,
        }) => import::run_import(config, &files, slack, priority).await,
        None => {
            println!("ripple: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("ripple: {e}");
        std::process::exit(1);
    }
}
