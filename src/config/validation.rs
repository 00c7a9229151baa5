//! Configuration validation logic

use crate::config::{
    DeploymentConfig, HookConfig, ProfileConfig, RigConfig, VariableDefinition,
};
use crate::runtime::RUNTIME_PREFIX;
use anyhow::{Result, anyhow};
use regex::Regex;
use std::sync::LazyLock;

static VARIABLE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$")
        .unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// Validate a complete configuration
///
/// # Errors
///
/// Returns an error if:
/// - A variable name is invalid or shadows the runtime namespace
/// - A variable definition mixes multiple sources
/// - An image, deployment, hook, profile or dependency is malformed
#[inline]
pub fn validate_config(config: &RigConfig) -> Result<()> {
    for (name, definition) in &config.vars {
        validate_variable(name, definition)?;
    }

    for (name, image) in &config.images {
        if image.image.trim().is_empty() {
            return Err(anyhow!("Image '{name}': image name cannot be empty"));
        }
        for tag in &image.tags {
            if tag.trim().is_empty() {
                return Err(anyhow!("Image '{name}': tags cannot contain empty entries"));
            }
        }
    }

    for deployment in &config.deployments {
        validate_deployment(deployment)?;
    }

    for (index, hook) in config.hooks.iter().enumerate() {
        validate_hook(hook, index)?;
    }

    for (name, command) in &config.pipelines {
        if command.trim().is_empty() {
            return Err(anyhow!("Pipeline '{name}': command cannot be empty"));
        }
    }

    for profile in &config.profiles {
        validate_profile(profile)?;
    }

    for dependency in &config.dependencies {
        if dependency.name.trim().is_empty() {
            return Err(anyhow!("Dependencies must have a name"));
        }
        if dependency.path.trim().is_empty() {
            return Err(anyhow!(
                "Dependency '{}': path cannot be empty",
                dependency.name
            ));
        }
    }

    Ok(())
}

/// Validate a single variable definition
fn validate_variable(name: &str, definition: &VariableDefinition) -> Result<()> {
    if !VARIABLE_NAME_REGEX.is_match(name) {
        return Err(anyhow!("Variable '{name}': invalid variable name"));
    }
    if name == "runtime" || name.starts_with(RUNTIME_PREFIX) {
        return Err(anyhow!(
            "Variable '{name}': the 'runtime.' namespace is reserved"
        ));
    }

    let VariableDefinition::Spec(spec) = definition else {
        return Ok(());
    };

    // value, env and command are mutually exclusive sources
    let sources = [
        spec.value.is_some(),
        spec.env.is_some(),
        spec.command.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if sources > 1 {
        return Err(anyhow!(
            "Variable '{name}': only one of 'value', 'env' or 'command' may be set"
        ));
    }
    if spec.question.is_some() && sources > 0 {
        return Err(anyhow!(
            "Variable '{name}': 'question' cannot be combined with 'value', 'env' or 'command'"
        ));
    }

    Ok(())
}

/// Validate a single deployment configuration
fn validate_deployment(deployment: &DeploymentConfig) -> Result<()> {
    if deployment.name.trim().is_empty() {
        return Err(anyhow!("Deployments must have a name"));
    }
    let context = format!("Deployment '{}'", deployment.name);

    match (deployment.helm.as_ref(), deployment.kubectl.as_ref()) {
        (Some(helm), None) => {
            if helm.chart.as_deref().unwrap_or_default().trim().is_empty() {
                return Err(anyhow!("{context}: helm chart cannot be empty"));
            }
        }
        (None, Some(kubectl)) => {
            if kubectl.manifests.is_empty() {
                return Err(anyhow!(
                    "{context}: kubectl deployments must list at least one manifest"
                ));
            }
        }
        (Some(_), Some(_)) => {
            return Err(anyhow!("{context}: cannot specify both 'helm' and 'kubectl'"));
        }
        (None, None) => {
            return Err(anyhow!(
                "{context}: must specify either 'helm' or 'kubectl'"
            ));
        }
    }

    Ok(())
}

/// Validate a single hook configuration
fn validate_hook(hook: &HookConfig, index: usize) -> Result<()> {
    let context = format!("Hook #{}", index + 1);

    if hook.events.is_empty() {
        return Err(anyhow!("{context}: must list at least one event"));
    }
    if hook.command.trim().is_empty() {
        return Err(anyhow!("{context}: command cannot be empty"));
    }

    Ok(())
}

/// Validate a single profile definition
fn validate_profile(profile: &ProfileConfig) -> Result<()> {
    if profile.name.trim().is_empty() {
        return Err(anyhow!("Profiles must have a name"));
    }
    let context = format!("Profile '{}'", profile.name);

    for (index, patch) in profile.patches.iter().enumerate() {
        if patch.path.trim().is_empty() {
            return Err(anyhow!("{}: Patch #{}: path cannot be empty", context, index + 1));
        }
    }

    Ok(())
}
