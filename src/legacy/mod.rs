//! Legacy `image(name)` / `tag(name)` helper resolution
//!
//! Older configs embed call-like helpers inside strings wherever an image
//! reference is expected. Resolution consults the local image cache first,
//! then the static image config. Unmatched helper calls are intentionally
//! left untouched: callers doing multiple replacement passes rely on later
//! passes catching helpers unresolved by an earlier one.

use crate::config::{ConfigAggregate, ImageNameTag};
use crate::dependency::{self, Dependency};
use anyhow::Result;
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"image\("?'?([^)"']+)"?'?\)"#)
        .unwrap_or_else(|_| unreachable!("static regex is valid"))
});

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"tag\("?'?([^)"']+)"?'?\)"#)
        .unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// Outcome of a single image lookup
struct ResolvedImage {
    found: bool,
    should_redeploy: bool,
    resolved: String,
}

/// Resolve all legacy helpers in a string
///
/// Tries the whole string as a plain image reference first, then replaces
/// every `image(...)` and `tag(...)` occurrence. The returned flag is true
/// iff any referenced image was built this run, in which case a referencing
/// deployment must be redeployed even though its manifest did not textually
/// change.
///
/// # Errors
///
/// Returns an error if a helper references a dependency whose config cannot
/// be consulted.
#[inline]
pub fn replace(
    value: &str,
    config: &ConfigAggregate,
    dependencies: &[Dependency],
) -> Result<(bool, Value)> {
    // the whole value might simply be an image name
    let plain = resolve_image(value, config, dependencies, false, false, false);
    if plain.found {
        return Ok((plain.should_redeploy, Value::String(plain.resolved)));
    }

    let (helper_redeploy, resolved) = replace_helpers(value, config, dependencies)?;
    Ok((
        plain.should_redeploy || helper_redeploy,
        Value::String(resolved),
    ))
}

/// Replace only the `image()` / `tag()` helper calls in a string
///
/// # Errors
///
/// Returns an error if a helper references a dependency whose config cannot
/// be consulted.
#[inline]
pub fn replace_helpers(
    value: &str,
    config: &ConfigAggregate,
    dependencies: &[Dependency],
) -> Result<(bool, String)> {
    let (image_redeploy, value) = replace_with_regex(value, &IMAGE_REGEX, |name| {
        resolve_image(name, config, dependencies, true, true, false)
    });
    let (tag_redeploy, value) = replace_with_regex(&value, &TAG_REGEX, |name| {
        resolve_image(name, config, dependencies, true, false, true)
    });

    Ok((image_redeploy || tag_redeploy, value))
}

fn replace_with_regex(
    input: &str,
    regex: &Regex,
    resolve: impl Fn(&str) -> ResolvedImage,
) -> (bool, String) {
    let mut out = input.to_owned();
    let mut should_redeploy = false;

    for captures in regex.captures_iter(input) {
        let Some(name) = captures.get(1) else {
            continue;
        };
        let resolved = resolve(name.as_str());
        if !resolved.found {
            // unmatched helpers are silently preserved for later passes
            continue;
        }

        should_redeploy = should_redeploy || resolved.should_redeploy;
        let whole_match = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
        out = out.replacen(whole_match, &resolved.resolved, 1);
    }

    (should_redeploy, out)
}

/// Resolve a single image reference
///
/// With `try_image_key` the name is first treated as an image config key,
/// optionally dot-qualified as `dependency.imageKey`. Without it the name is
/// matched against cached or configured image names directly.
fn resolve_image(
    name: &str,
    config: &ConfigAggregate,
    dependencies: &[Dependency],
    try_image_key: bool,
    only_image: bool,
    only_tag: bool,
) -> ResolvedImage {
    let not_found = |should_redeploy| ResolvedImage {
        found: false,
        should_redeploy,
        resolved: name.to_owned(),
    };

    // a dot-qualified key redirects into the named dependency's config
    let mut config = config;
    let mut key = name;
    if try_image_key {
        if let Some((dep_name, rest)) = name.split_once('.') {
            if let Some(dep) = dependency::find(dependencies, dep_name) {
                config = dep.config();
                key = rest;
            }
        }
    }

    let built_images = config.built_images();
    let image_cache_map = config.local_cache().list_image_cache();

    // prefer a matching image cache entry over the static image config
    let image_cache = if try_image_key {
        image_cache_map.get(key).cloned()
    } else {
        image_cache_map
            .values()
            .find(|entry| entry.image_name == key)
            .cloned()
    };

    let (image, original_tag) = strip_image_tag(key);
    let cached_image_name = image_cache
        .as_ref()
        .map(|entry| strip_image_tag(&entry.image_name).0.to_owned())
        .unwrap_or_default();

    let should_redeploy = in_built_images(&built_images, image)
        || (!cached_image_name.is_empty() && in_built_images(&built_images, &cached_image_name));

    if let Some(cache) = &image_cache {
        if only_image {
            return ResolvedImage {
                found: true,
                should_redeploy,
                resolved: cache.resolve_image().to_owned(),
            };
        }
        if only_tag {
            let tag = if cache.tag.is_empty() {
                "latest"
            } else {
                &cache.tag
            };
            return ResolvedImage {
                found: true,
                should_redeploy,
                resolved: tag.to_owned(),
            };
        }
        let resolved = if cache.tag.is_empty() {
            cache.resolve_image().to_owned()
        } else {
            format!("{}:{}", cache.resolve_image(), cache.tag)
        };
        return ResolvedImage {
            found: true,
            should_redeploy,
            resolved,
        };
    }

    // fall back to the static image config
    let images = &config.config().images;
    let matched = if try_image_key {
        images.get(key).map(|image_config| (key, image_config))
    } else {
        images
            .iter()
            .find(|(_, image_config)| image_config.image == image)
            .map(|(k, v)| (k.as_str(), v))
    };
    let Some((config_key, image_config)) = matched else {
        return not_found(should_redeploy);
    };

    let should_redeploy = should_redeploy || in_built_images(&built_images, &image_config.image);

    let effective_image = image_cache_map
        .get(config_key)
        .filter(|entry| !entry.local_registry_image_name.is_empty())
        .map(|entry| entry.local_registry_image_name.clone())
        .unwrap_or_else(|| image_config.image.clone());

    if only_image {
        return ResolvedImage {
            found: true,
            should_redeploy,
            resolved: effective_image,
        };
    }

    // tag precedence: explicit tag on the reference, then first static tag
    let mut tag = original_tag.unwrap_or_default().to_owned();
    if tag.is_empty() {
        if let Some(first) = image_config.tags.first() {
            // '#' has special meaning in the tag template grammar
            tag = first.replace('#', "x");
        }
    }

    if only_tag {
        let resolved = if tag.is_empty() { "latest".to_owned() } else { tag };
        return ResolvedImage {
            found: true,
            should_redeploy,
            resolved,
        };
    }

    let resolved = if tag.is_empty() {
        effective_image
    } else {
        format!("{effective_image}:{tag}")
    };
    ResolvedImage {
        found: true,
        should_redeploy,
        resolved,
    }
}

fn in_built_images(built_images: &HashMap<String, ImageNameTag>, image: &str) -> bool {
    !image.is_empty() && built_images.values().any(|entry| entry.image_name == image)
}

/// Split a docker image reference into name and optional tag
///
/// A colon only separates a tag when it appears after the last slash,
/// otherwise it belongs to a registry port.
fn strip_image_tag(reference: &str) -> (&str, Option<&str>) {
    if let Some(idx) = reference.rfind(':') {
        let after_slash = reference.rfind('/').is_none_or(|slash| idx > slash);
        if after_slash {
            return (
                reference.get(..idx).unwrap_or(reference),
                reference.get(idx + 1..),
            );
        }
    }
    (reference, None)
}
