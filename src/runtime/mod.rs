//! Runtime variable resolution
//!
//! Runtime variables (`runtime.*`) reference values that only exist after
//! build or deploy phases ran: built image tags, dependency outputs, ad-hoc
//! values published by pipelines. Resolution runs in a fixed pass order so
//! that runtime tokens survive the early passes untouched and are resolved
//! exactly once at the end:
//!
//! 1. non-runtime variables (plus legacy helpers when enabled)
//! 2. shell expressions
//! 3. non-runtime variables again (expressions may introduce new tokens)
//! 4. runtime variables only

mod variable;

pub use variable::load_runtime_variable;

use crate::config::ConfigAggregate;
use crate::dependency::Dependency;
use crate::error::RigError;
use crate::vars::expression;
use crate::vars::{parse_string, value_to_string};
use crate::{legacy, walk};
use anyhow::Result;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Namespace prefix of runtime variables
pub const RUNTIME_PREFIX: &str = "runtime.";

/// Document locations eligible for runtime-variable substitution
///
/// Everything else is resolved before any build or deploy has happened, so
/// runtime tokens are rejected there by the loader.
pub const RUNTIME_VAR_PATHS: &[&str] = &[
    "images/*/build/command",
    "images/*/build/args/**",
    "deployments/*/helm/values/**",
    "deployments/*/kubectl/manifests/**",
    "hooks/*/command",
    "hooks/*/args/**",
    "pipelines/**",
];

/// Resolver for runtime-dependent values
pub struct RuntimeResolver {
    working_directory: PathBuf,
    enable_legacy_helpers: bool,
}

enum Pass {
    /// Resolve non-runtime tokens, round-trip runtime tokens unchanged
    NonRuntime { legacy_helpers: bool },
    /// Resolve runtime tokens, round-trip non-runtime tokens unchanged
    RuntimeOnly,
}

impl RuntimeResolver {
    /// Create a resolver executing expressions in `working_directory`
    #[must_use]
    #[inline]
    pub fn new(working_directory: &Path, enable_legacy_helpers: bool) -> Self {
        Self {
            working_directory: working_directory.to_path_buf(),
            enable_legacy_helpers,
        }
    }

    /// Resolve all variables in the haystack, runtime ones included
    ///
    /// # Errors
    ///
    /// Returns an error if a runtime variable cannot be found or an
    /// expression fails.
    #[inline]
    pub fn fill_runtime_variables(
        &self,
        system: &dyn crate::system::System,
        haystack: &mut Value,
        config: &ConfigAggregate,
        dependencies: &[Dependency],
    ) -> Result<()> {
        self.fill_runtime_variables_with_rebuild(system, haystack, config, dependencies)
            .map(|_| ())
    }

    /// Resolve all variables and report whether a rebuilt image was referenced
    ///
    /// The returned flag propagates upward so a referencing deployment is
    /// marked dirty even though its manifest did not textually change.
    ///
    /// # Errors
    ///
    /// Returns an error if a runtime variable cannot be found or an
    /// expression fails.
    #[inline]
    pub fn fill_runtime_variables_with_rebuild(
        &self,
        system: &dyn crate::system::System,
        haystack: &mut Value,
        config: &ConfigAggregate,
        dependencies: &[Dependency],
    ) -> Result<bool> {
        let first = self.fill_variables(
            haystack,
            config,
            dependencies,
            &Pass::NonRuntime {
                legacy_helpers: self.enable_legacy_helpers,
            },
        )?;

        expression::resolve_all_expressions(
            haystack,
            &self.working_directory,
            system,
            &[],
            &[],
            &config.variables(),
        )?;

        // expressions may have produced new variable tokens
        let second = self.fill_variables(
            haystack,
            config,
            dependencies,
            &Pass::NonRuntime {
                legacy_helpers: false,
            },
        )?;

        let third = self.fill_variables(haystack, config, dependencies, &Pass::RuntimeOnly)?;

        Ok(first || second || third)
    }

    /// Resolve all variables and render the result as a single string
    ///
    /// # Errors
    ///
    /// Returns an error if a runtime variable cannot be found or an
    /// expression fails.
    #[inline]
    pub fn fill_runtime_variables_as_string(
        &self,
        system: &dyn crate::system::System,
        haystack: &str,
        config: &ConfigAggregate,
        dependencies: &[Dependency],
    ) -> Result<String> {
        let mut value = Value::String(haystack.to_owned());
        self.fill_runtime_variables(system, &mut value, config, dependencies)?;
        Ok(value_to_string(&value))
    }

    fn fill_variables(
        &self,
        haystack: &mut Value,
        config: &ConfigAggregate,
        dependencies: &[Dependency],
        pass: &Pass,
    ) -> Result<bool> {
        let mut should_rebuild = false;
        walk::walk(
            haystack,
            &|_path, _key, _value| true,
            &mut |_path, value| {
                let (rebuild, replaced) = self.replace_string(value, config, dependencies, pass)?;
                should_rebuild = should_rebuild || rebuild;
                Ok(replaced)
            },
        )?;
        Ok(should_rebuild)
    }

    fn replace_string(
        &self,
        value: &str,
        config: &ConfigAggregate,
        dependencies: &[Dependency],
        pass: &Pass,
    ) -> Result<(bool, Value)> {
        let mut should_rebuild = false;
        let parsed = parse_string(value, &mut |name| match pass {
            Pass::NonRuntime { .. } => {
                if name.starts_with(RUNTIME_PREFIX) {
                    // round-trip runtime tokens so they survive until pass 4
                    return Ok(Value::String(format!("${{{name}}}")));
                }
                let (rebuild, resolved) = self.resolve(name, config, dependencies)?;
                should_rebuild = should_rebuild || rebuild;
                Ok(resolved)
            }
            Pass::RuntimeOnly => {
                if !name.starts_with(RUNTIME_PREFIX) {
                    return Ok(Value::String(format!("${{{name}}}")));
                }
                let (rebuild, resolved) = self.resolve(name, config, dependencies)?;
                should_rebuild = should_rebuild || rebuild;
                Ok(resolved)
            }
        })?;

        if let Pass::NonRuntime {
            legacy_helpers: true,
        } = pass
        {
            if let Value::String(s) = &parsed {
                let (redeploy, replaced) = legacy::replace(s, config, dependencies)?;
                return Ok((should_rebuild || redeploy, replaced));
            }
        }

        Ok((should_rebuild, parsed))
    }

    fn resolve(
        &self,
        name: &str,
        config: &ConfigAggregate,
        dependencies: &[Dependency],
    ) -> Result<(bool, Value)> {
        let name = name.trim();

        // already resolved earlier in the session
        if let Some(cached) = config.variable(name) {
            return Ok((false, cached));
        }

        if name.starts_with(RUNTIME_PREFIX) {
            let (should_rebuild, value) = load_runtime_variable(name, config, dependencies)?;
            // cache so the loader is consulted once per session
            config.set_variable(name, value.clone());
            return Ok((should_rebuild, value));
        }

        // unknown non-runtime names are preserved for later passes
        Ok((false, Value::String(format!("${{{name}}}"))))
    }
}

/// Check that runtime tokens only appear at eligible document locations
///
/// # Errors
///
/// Returns an error naming the offending path when a runtime variable is
/// found outside the allow-list.
#[inline]
pub fn check_runtime_variable_placement(haystack: &mut Value) -> Result<()> {
    let include = expression::compile_path_patterns(RUNTIME_VAR_PATHS)?;
    walk::walk(
        haystack,
        &|path, _key, value| {
            value.contains("${runtime.")
                && !include.iter().any(|pattern| pattern.is_match(path))
        },
        &mut |path, _value| {
            Err(RigError::runtime(format!(
                "runtime variables are not allowed at {path}, only in build commands, helm values, hooks and pipelines"
            ))
            .into())
        },
    )
}
