//! Loading of individual runtime variables

use crate::config::ConfigAggregate;
use crate::dependency::{self, Dependency};
use crate::error::RigError;
use anyhow::Result;
use serde_yaml::Value;

use super::RUNTIME_PREFIX;

const DEPENDENCIES_PREFIX: &str = "dependencies.";
const IMAGES_PREFIX: &str = "images.";

/// Resolve a single `runtime.*` variable
///
/// The returned flag is true iff the variable references an image that was
/// built this run, signaling that a consumer must be redeployed.
///
/// # Errors
///
/// Returns an error if:
/// - The name is not in the runtime namespace
/// - A referenced dependency is not loaded
/// - The referenced image or variable does not exist
#[inline]
pub fn load_runtime_variable(
    name: &str,
    config: &ConfigAggregate,
    dependencies: &[Dependency],
) -> Result<(bool, Value)> {
    let Some(mut rest) = name.strip_prefix(RUNTIME_PREFIX) else {
        return Err(RigError::runtime(format!("{name} is no runtime variable")).into());
    };

    // redirect into the named dependency's own config and variable set
    let mut config = config;
    let mut dependencies = dependencies;
    while let Some(qualified) = rest.strip_prefix(DEPENDENCIES_PREFIX) {
        let Some((dep_name, dep_rest)) = qualified.split_once('.') else {
            return Err(RigError::runtime(format!(
                "unexpected runtime variable {name}, need format runtime.dependencies.NAME.VARIABLE"
            ))
            .into());
        };
        let Some(dep) = dependency::find(dependencies, dep_name) else {
            return Err(RigError::runtime(format!(
                "couldn't find runtime variable {name}, make sure the dependency {dep_name} was loaded"
            ))
            .into());
        };
        config = dep.config();
        dependencies = dep.children();
        rest = dep_rest;
    }

    // ad-hoc values published by build/deploy phases win over image lookups
    if let Some(value) = config.runtime_variable(rest) {
        return Ok((false, value));
    }

    if let Some(image_var) = rest.strip_prefix(IMAGES_PREFIX) {
        return load_image_variable(name, image_var, config);
    }

    Err(RigError::runtime(format!("couldn't find runtime variable {name}")).into())
}

fn load_image_variable(
    name: &str,
    image_var: &str,
    config: &ConfigAggregate,
) -> Result<(bool, Value)> {
    let (image_key, only_image, only_tag) = if let Some(key) = image_var.strip_suffix(".tag") {
        (key, false, true)
    } else if let Some(key) = image_var.strip_suffix(".image") {
        (key, true, false)
    } else {
        (image_var, false, false)
    };

    let Some(image_config) = config.config().images.get(image_key) else {
        return Err(RigError::runtime(format!(
            "couldn't find image {image_key} resolving variable {name}"
        ))
        .into());
    };

    let should_rebuild = config
        .built_images()
        .values()
        .any(|entry| entry.image_name == image_config.image);

    if only_image {
        return Ok((should_rebuild, Value::String(image_config.image.clone())));
    }

    // tag precedence: image cache, then first statically declared tag
    let mut tag = config
        .local_cache()
        .get_image_cache(image_key)
        .map(|cache| cache.tag)
        .unwrap_or_default();
    if tag.is_empty() {
        if let Some(first) = image_config.tags.first() {
            tag = first.replace('#', "x");
        }
    }

    if only_tag {
        let tag = if tag.is_empty() { "latest".to_owned() } else { tag };
        return Ok((should_rebuild, Value::String(tag)));
    }

    let resolved = if tag.is_empty() {
        image_config.image.clone()
    } else {
        format!("{}:{}", image_config.image, tag)
    };
    Ok((should_rebuild, Value::String(resolved)))
}
