//! Session-scoped variable resolver
//!
//! Resolves `${name}` tokens against variable definitions, command-line
//! overrides, the environment and interactive prompts. Once a variable is
//! resolved in a session, re-resolution returns the cached value without
//! re-prompting or re-running a command. Prompt answers are additionally
//! persisted to the local cache across process runs unless the definition
//! opts out with `noCache`.

use crate::cache::LocalCache;
use crate::config::VariableSpec;
use crate::error::RigError;
use crate::system::System;
use crate::vars::expression::{
    compile_path_patterns, excluded_path, execute_shell, resolve_all_expressions,
};
use crate::vars::{VAR_MATCH_REGEX, convert_string_value, parse_string, value_to_string};
use crate::walk;
use anyhow::Result;
use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Merge `--var key=value` flags into a resolved variables map
///
/// # Errors
///
/// Returns an error for flags without a `=` separator.
#[inline]
pub fn merge_vars_with_flags(vars: &mut HashMap<String, Value>, flags: &[String]) -> Result<()> {
    for flag in flags {
        let Some((name, value)) = flag.split_once('=') else {
            return Err(RigError::variable(format!(
                "wrong --var format: {flag}, expected 'key=val'"
            ))
            .into());
        };
        vars.insert(
            name.trim().to_owned(),
            convert_string_value(value.trim()),
        );
    }
    Ok(())
}

/// Resolver that caches resolved variables in memory and in the local cache
pub struct Resolver<'s> {
    system: &'s dyn System,
    local_cache: Arc<LocalCache>,
    config_dir: PathBuf,
    vars: IndexMap<String, VariableSpec>,
    memory_cache: Mutex<HashMap<String, Value>>,
    in_progress: Mutex<HashSet<String>>,
}

impl<'s> Resolver<'s> {
    /// Create a new resolver
    ///
    /// # Errors
    ///
    /// Returns an error if a `--var` flag is malformed.
    #[inline]
    pub fn new(
        system: &'s dyn System,
        local_cache: Arc<LocalCache>,
        config_dir: &Path,
        flags: &[String],
    ) -> Result<Self> {
        let mut memory_cache = HashMap::new();
        merge_vars_with_flags(&mut memory_cache, flags)?;

        Ok(Self {
            system,
            local_cache,
            config_dir: config_dir.to_path_buf(),
            vars: IndexMap::new(),
            memory_cache: Mutex::new(memory_cache),
            in_progress: Mutex::new(HashSet::new()),
        })
    }

    /// Replace the variable definitions consulted during resolution
    #[inline]
    pub fn update_vars(&mut self, vars: IndexMap<String, VariableSpec>) {
        self.vars = vars;
    }

    /// Snapshot of all variables resolved so far this session
    #[must_use]
    #[inline]
    pub fn resolved_variables(&self) -> HashMap<String, Value> {
        self.memory_cache
            .lock()
            .map(|cache| cache.clone())
            .unwrap_or_default()
    }

    /// Resolve every variable and expression in the haystack in place
    ///
    /// # Errors
    ///
    /// Returns an error if any variable or expression fails to resolve.
    #[inline]
    pub fn fill_variables(&self, haystack: &mut Value) -> Result<()> {
        self.fill_variables_exclude(haystack, &[])
    }

    /// Resolve the haystack, skipping excluded document paths
    ///
    /// Runs fill, then expressions, then fill again: expressions may
    /// introduce new variable tokens that the second fill picks up.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable or expression fails to resolve.
    #[inline]
    pub fn fill_variables_exclude(
        &self,
        haystack: &mut Value,
        excluded_paths: &[&str],
    ) -> Result<()> {
        let exclude = compile_path_patterns(excluded_paths)?;

        self.fill(haystack, &exclude)?;
        resolve_all_expressions(
            haystack,
            &self.config_dir,
            self.system,
            &exclude,
            &[],
            &self.resolved_variables(),
        )?;
        self.fill(haystack, &exclude)
    }

    fn fill(&self, haystack: &mut Value, exclude: &[regex::Regex]) -> Result<()> {
        walk::walk(
            haystack,
            &|path, _key, value| {
                VAR_MATCH_REGEX.is_match(value) && !excluded_path(path, exclude, &[])
            },
            &mut |_path, value| parse_string(value, &mut |name| self.resolve(name)),
        )
    }

    /// Resolve a single variable by name
    ///
    /// Unknown names fall back to the process environment; names without
    /// any source round-trip as a literal `${name}` so that later passes
    /// (runtime resolution) can pick them up.
    ///
    /// # Errors
    ///
    /// Returns an error on circular references or failing sources.
    #[inline]
    pub fn resolve(&self, name: &str) -> Result<Value> {
        let name = name.trim();

        if let Some(cached) = self.cached(name) {
            return Ok(cached);
        }

        let Some(spec) = self.vars.get(name).cloned() else {
            // plain environment variables work without a definition
            if let Ok(env_value) = self.system.env_var(name) {
                if !env_value.is_empty() {
                    let value = convert_string_value(&env_value);
                    self.cache(name, value.clone());
                    return Ok(value);
                }
            }
            return Ok(Value::String(format!("${{{name}}}")));
        };

        {
            let mut in_progress = self
                .in_progress
                .lock()
                .map_err(|e| anyhow::anyhow!("resolver lock poisoned: {e}"))?;
            if !in_progress.insert(name.to_owned()) {
                return Err(RigError::variable(format!(
                    "circular reference resolving variable {name}"
                ))
                .into());
            }
        }

        let result = self.fill_variable(name, &spec);

        if let Ok(mut in_progress) = self.in_progress.lock() {
            in_progress.remove(name);
        }

        let value = result?;
        self.cache(name, value.clone());
        Ok(value)
    }

    fn fill_variable(&self, name: &str, spec: &VariableSpec) -> Result<Value> {
        if let Some(value) = &spec.value {
            // static values may themselves contain variable tokens
            return self.resolve_nested(value);
        }

        if let Some(env_key) = &spec.env {
            return match self.system.env_var(env_key) {
                Ok(env_value) => Ok(convert_string_value(&env_value)),
                Err(_) => spec.default.clone().ok_or_else(|| {
                    RigError::variable(format!(
                        "couldn't find environment variable {env_key} for variable {name}"
                    ))
                    .into()
                }),
            };
        }

        if let Some(command) = &spec.command {
            return self.fill_from_command(name, command);
        }

        self.fill_from_question(name, spec)
    }

    fn fill_from_command(&self, name: &str, command: &str) -> Result<Value> {
        let resolved_command = match self.resolve_nested(&Value::String(command.to_owned()))? {
            Value::String(s) => s,
            other => value_to_string(&other),
        };

        let output = execute_shell(
            &resolved_command,
            &self.config_dir,
            self.system,
            &self.resolved_variables(),
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RigError::variable(format!(
                "command for variable {name} failed with exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ))
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(convert_string_value(stdout.trim()))
    }

    fn fill_from_question(&self, name: &str, spec: &VariableSpec) -> Result<Value> {
        // a previously persisted answer skips the prompt entirely
        if !spec.no_cache {
            if let Some(cached) = self.local_cache.get_var(name) {
                debug!("Using cached answer for variable {name}");
                return Ok(convert_string_value(&cached));
            }
        }

        let question = spec
            .question
            .clone()
            .unwrap_or_else(|| format!("Please enter a value for {name}"));

        let answer = self.system.prompt(&question)?;
        if answer.is_empty() {
            if let Some(default) = &spec.default {
                if !spec.no_cache {
                    self.local_cache.set_var(name, &value_to_string(default));
                }
                return Ok(default.clone());
            }
        }

        if !spec.no_cache {
            self.local_cache.set_var(name, &answer);
        }
        Ok(convert_string_value(&answer))
    }

    fn resolve_nested(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) => parse_string(s, &mut |name| self.resolve(name)),
            other => Ok(other.clone()),
        }
    }

    fn cached(&self, name: &str) -> Option<Value> {
        let cache = self.memory_cache.lock().ok()?;
        cache.get(name).cloned()
    }

    fn cache(&self, name: &str, value: Value) {
        if let Ok(mut cache) = self.memory_cache.lock() {
            cache.insert(name.to_owned(), value);
        }
    }
}
