//! `devrig` - A CLI tool for resolving development environment configurations
//!
//! This library loads a YAML project configuration, applies profile patches,
//! resolves variables and shell expressions, and hands downstream consumers
//! an immutable snapshot of the result. Runtime-dependent values (image
//! names, tags) resolve in a separate late pass once builds have happened.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod legacy;
pub mod patch;
pub mod runtime;
pub mod system;
pub mod vars;
pub mod walk;

use anyhow::Result;
use cli::{Args, Command};
use config::load_config;
use serde_json::json;
use std::path::Path;
use system::{RealSystem, System};
use vars::value_to_string;

/// Main entry point for the devrig library
pub fn run(args: Args) -> Result<()> {
    let system = RealSystem;
    let output = match args.command {
        Command::Print => run_print(&system, &args)?,
        Command::Vars { json } => run_vars(&system, &args, json)?,
    };
    println!("{output}");
    Ok(())
}

/// Run the print command: the fully resolved configuration as YAML
pub fn run_print(system: &dyn System, args: &Args) -> Result<String> {
    let loaded = load_config(system, Path::new(&args.config), &args.options())?;
    let rendered = serde_yaml::to_string(loaded.config.raw())?;
    Ok(rendered.trim_end().to_owned())
}

/// Run the vars command: the session's variable table
///
/// Variables resolve lazily, so a defined variable never referenced by the
/// document shows up without a value.
pub fn run_vars(system: &dyn System, args: &Args, as_json: bool) -> Result<String> {
    let loaded = load_config(system, Path::new(&args.config), &args.options())?;
    let resolved = loaded.config.variables();

    // definition order first, then extra resolved names (flags, env lookups)
    let mut names: Vec<String> = loaded.config.config().vars.keys().cloned().collect();
    let mut extras: Vec<String> = resolved
        .keys()
        .filter(|name| !names.contains(name))
        .cloned()
        .collect();
    extras.sort();
    names.extend(extras);

    if as_json {
        let table: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .map(|name| {
                let value = resolved
                    .get(name)
                    .map_or(serde_json::Value::Null, |v| json!(value_to_string(v)));
                (name.clone(), value)
            })
            .collect();
        return Ok(serde_json::to_string_pretty(&table)?);
    }

    let width = names.iter().map(String::len).max().unwrap_or(4).max(4);
    let mut out = format!("{:width$}  VALUE", "NAME");
    for name in &names {
        let value = resolved.get(name).map_or_else(|| "-".to_owned(), value_to_string);
        out.push('\n');
        out.push_str(&format!("{name:width$}  {value}"));
    }
    Ok(out)
}
