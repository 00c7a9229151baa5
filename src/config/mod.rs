//! Configuration management module
//!
//! Handles YAML configuration parsing, profile patching, variable resolution
//! and the immutable config aggregate handed to downstream consumers.

pub mod aggregate;
pub mod loader;
pub mod validation;

pub use aggregate::{ConfigAggregate, ImageNameTag};
pub use loader::{ConfigOptions, LoadedConfig, load_config};

use crate::patch::Operation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Default config file name
pub const DEFAULT_CONFIG_NAME: &str = "devrig.yaml";

/// Directory holding per-project cache files, relative to the config
pub const CACHE_DIR: &str = ".devrig";

/// Main typed configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    /// Project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Variable definitions, resolved lazily and cached per session
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub vars: IndexMap<String, VariableDefinition>,

    /// Image build configurations keyed by config name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub images: IndexMap<String, ImageConfig>,

    /// Deployment configurations
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deployments: Vec<DeploymentConfig>,

    /// Lifecycle hooks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookConfig>,

    /// Named pipeline bodies, executed by the pipeline engine
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub pipelines: IndexMap<String, String>,

    /// Configuration profiles applied as structural patches
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileConfig>,

    /// Dependency projects whose configs are loaded alongside this one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyConfig>,
}

/// A variable definition, either a literal shorthand or a full spec
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableDefinition {
    /// Full definition with an explicit source
    Spec(VariableSpec),

    /// `NAME: value` shorthand
    Shorthand(Value),
}

impl VariableDefinition {
    /// Normalize into a full spec
    #[must_use]
    #[inline]
    pub fn spec(&self) -> VariableSpec {
        match self {
            Self::Spec(spec) => spec.clone(),
            Self::Shorthand(value) => VariableSpec {
                value: Some(value.clone()),
                ..VariableSpec::default()
            },
        }
    }
}

/// Full variable definition
///
/// Exactly one source is consulted, in order: `value`, `env`, `command`,
/// interactive question. `default` applies to the env and question sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct VariableSpec {
    /// Static value, may itself contain variable tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Environment variable to read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Shell command whose trimmed stdout becomes the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Question asked interactively when no other source applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    /// Fallback when the env variable is unset or the answer is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Skip persisting the answer to the local cache
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_cache: bool,
}

/// Image build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Image name without tag
    pub image: String,

    /// Statically declared tag templates; `#` characters are placeholders
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Dockerfile path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    /// Build context path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Build command override and arguments, resolved at build time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
}

/// Custom build command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Deployment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlConfig>,
}

/// Helm deployment settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Values document, resolved at deploy time (runtime variables allowed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
}

/// Kubectl deployment settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubectlConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
}

/// Lifecycle hook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    /// Events that trigger the hook, e.g. `before:build`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,

    /// Command to execute, resolved at hook time (runtime variables allowed)
    pub command: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// A named profile: an ordered list of patch operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Operation>,
}

/// Reference to a dependency project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DependencyConfig {
    pub name: String,

    /// Path to the dependency's config file or directory, relative to this config
    pub path: String,
}
