//! # `devrig`
//!
//! `devrig` is a command-line tool for resolving development environment
//! configurations. It loads a `devrig.yaml` project file, applies profile
//! patches, resolves `${variable}` tokens and `$(shell expression)` blocks,
//! and prints the final configuration or its variable table.
//!
//! ## Usage
//!
//! **Print the resolved configuration:**
//! ```sh
//! devrig print --config devrig.yaml --profile staging --var REGISTRY=ghcr.io/acme
//! ```
//!
//! **List resolved variables:**
//! ```sh
//! devrig vars
//! ```
//!
//! See `devrig --help` for more options and details.

use anyhow::Result;
use clap::Parser as _;
use devrig::cli::Args;
use devrig::error::RigError;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber based on verbose flag
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // logs go to stderr so that printed YAML stays pipeable
    fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match devrig::run(args) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{}", err);
            std::process::exit(
                err.downcast_ref::<RigError>().map_or(1, RigError::exit_code),
            );
        }
    }
}
