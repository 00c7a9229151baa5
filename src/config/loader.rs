//! Configuration loading pipeline
//!
//! Loading runs in a fixed order: read and parse the raw document, apply
//! the requested profile patches, resolve variables and expressions
//! (excluding runtime-eligible locations), reject misplaced runtime
//! tokens, parse and validate the typed config, then load dependency
//! projects recursively.

use crate::cache::{LocalCache, RemoteCache};
use crate::config::{
    CACHE_DIR, ConfigAggregate, DEFAULT_CONFIG_NAME, ProfileConfig, RigConfig, VariableDefinition,
    validation,
};
use crate::dependency::Dependency;
use crate::error::RigError;
use crate::patch::apply_patches;
use crate::runtime::{RUNTIME_VAR_PATHS, check_runtime_variable_placement};
use crate::system::System;
use crate::vars::resolver::Resolver;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// File name of the local cache inside the cache directory
const LOCAL_CACHE_NAME: &str = "cache.yaml";

/// File name of the remote cache inside the cache directory
const REMOTE_CACHE_NAME: &str = "remote.yaml";

/// Options controlling a config load
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Profiles to apply, in order
    pub profiles: Vec<String>,

    /// `key=value` variable overrides from the command line
    pub vars: Vec<String>,
}

/// The result of a config load
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ConfigAggregate,
    pub dependencies: Vec<Dependency>,
}

/// Load, resolve and validate the configuration at `path`
///
/// # Errors
///
/// Returns an error if the file is missing or unparsable, a requested
/// profile does not exist, a variable or expression fails to resolve, a
/// runtime token appears outside its allowed locations, validation fails
/// or a dependency cannot be loaded.
#[inline]
pub fn load_config(
    system: &dyn System,
    path: &Path,
    options: &ConfigOptions,
) -> Result<LoadedConfig> {
    let mut visited = HashSet::new();
    load_config_recursive(system, path, options, &mut visited)
}

fn load_config_recursive(
    system: &dyn System,
    path: &Path,
    options: &ConfigOptions,
    visited: &mut HashSet<PathBuf>,
) -> Result<LoadedConfig> {
    if !system.is_file(path) {
        return Err(RigError::configuration(format!(
            "Configuration file not found: {}",
            path.display()
        ))
        .into());
    }
    if !visited.insert(path.to_path_buf()) {
        return Err(RigError::dependency(format!(
            "circular dependency detected at {}",
            path.display()
        ))
        .into());
    }
    debug!("Loading configuration from {}", path.display());

    let content = system
        .read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    let mut raw: Value = serde_yaml::from_str(&content).map_err(|e| {
        RigError::configuration(format!("Failed to parse {}: {e}", path.display()))
    })?;
    if raw.is_null() {
        raw = Value::Mapping(serde_yaml::Mapping::new());
    }

    apply_profiles(&mut raw, &options.profiles)?;

    // variable definitions come from the patched raw document so that
    // profiles may add or change them
    let vars = parse_vars(&raw)?;

    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let cache_dir = config_dir.join(CACHE_DIR);
    let local_cache = Arc::new(LocalCache::load(system, &cache_dir.join(LOCAL_CACHE_NAME)));
    let remote_cache = Arc::new(RemoteCache::load(system, &cache_dir.join(REMOTE_CACHE_NAME)));

    let mut resolver = Resolver::new(system, Arc::clone(&local_cache), config_dir, &options.vars)?;
    resolver.update_vars(vars.iter().map(|(name, def)| (name.clone(), def.spec())).collect());

    resolver.fill_variables_exclude(&mut raw, RUNTIME_VAR_PATHS)?;
    check_runtime_variable_placement(&mut raw)?;

    let parsed: RigConfig = serde_yaml::from_value(raw.clone())
        .map_err(|e| RigError::configuration(format!("Invalid configuration: {e}")))?;
    validation::validate_config(&parsed)?;

    let dependencies = load_dependencies(system, &parsed, config_dir, visited)?;

    // persist newly answered questions
    local_cache.save(system)?;

    let config = ConfigAggregate::new(
        raw,
        parsed,
        resolver.resolved_variables(),
        local_cache,
        remote_cache,
        path,
    );
    Ok(LoadedConfig {
        config,
        dependencies,
    })
}

/// Apply the requested profiles' patches to the raw document, in order
fn apply_profiles(raw: &mut Value, requested: &[String]) -> Result<()> {
    if requested.is_empty() {
        return Ok(());
    }

    let profiles: Vec<ProfileConfig> = match raw.get("profiles") {
        Some(node) => serde_yaml::from_value(node.clone())
            .map_err(|e| RigError::configuration(format!("Invalid profiles section: {e}")))?,
        None => Vec::new(),
    };

    for name in requested {
        let profile = profiles
            .iter()
            .find(|profile| profile.name == *name)
            .ok_or_else(|| RigError::configuration(format!("couldn't find profile '{name}'")))?;
        debug!("Applying profile {name}");
        apply_patches(raw, &profile.patches)
            .map_err(|e| RigError::configuration(format!("error applying profile '{name}': {e}")))?;
    }
    Ok(())
}

fn parse_vars(raw: &Value) -> Result<IndexMap<String, VariableDefinition>> {
    match raw.get("vars") {
        Some(node) => serde_yaml::from_value(node.clone())
            .map_err(|e| RigError::configuration(format!("Invalid vars section: {e}")).into()),
        None => Ok(IndexMap::new()),
    }
}

/// Recursively load dependency projects
///
/// A dependency path may point at a config file directly or at a project
/// directory containing one. Dependencies load without profiles or
/// variable overrides; the visited set rejects cycles.
fn load_dependencies(
    system: &dyn System,
    parsed: &RigConfig,
    config_dir: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<Vec<Dependency>> {
    let mut dependencies = Vec::with_capacity(parsed.dependencies.len());

    for dependency in &parsed.dependencies {
        let target = config_dir.join(&dependency.path);
        let config_path = if system.is_file(&target) {
            target.clone()
        } else {
            target.join(DEFAULT_CONFIG_NAME)
        };
        let local_path = config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let loaded =
            load_config_recursive(system, &config_path, &ConfigOptions::default(), visited)
                .map_err(|e| {
                    RigError::dependency(format!(
                        "failed to load dependency '{}': {e}",
                        dependency.name
                    ))
                })?;
        dependencies.push(Dependency::new(
            &dependency.name,
            local_path,
            loaded.config,
            loaded.dependencies,
        ));
    }

    Ok(dependencies)
}
