use crate::config::ConfigOptions;
use clap::{Parser, Subcommand};

/// Command-line arguments for devrig
#[derive(Parser, Debug, Clone)]
#[command(name = "devrig")]
#[command(about = "A CLI tool for resolving development environment configurations")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(long, value_name = "PATH", default_value = "./devrig.yaml")]
    pub config: String,

    /// Profiles to apply, in order (can be specified multiple times)
    #[arg(long = "profile", value_name = "NAME")]
    pub profiles: Vec<String>,

    /// Variable overrides in KEY=VALUE format (can be specified multiple times)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve the configuration and print it as YAML
    Print,

    /// Resolve the configuration and list its variables
    Vars {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    /// Convert the shared flags into config load options
    #[must_use]
    #[inline]
    pub fn options(&self) -> ConfigOptions {
        ConfigOptions {
            profiles: self.profiles.clone(),
            vars: self.vars.clone(),
        }
    }
}
