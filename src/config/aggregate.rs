//! Immutable-after-load configuration aggregate
//!
//! Holds the raw document, the typed config, the resolved variables and
//! both cache layers. The document and config are never mutated after
//! load; the session maps are mutex guarded because parallel build
//! workers legitimately read and update them once loading completes.

use crate::cache::{LocalCache, RemoteCache};
use crate::config::RigConfig;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// An image name/tag pair produced by the build phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageNameTag {
    pub image_name: String,
    pub tag: String,
}

/// The immutable holder of everything a config load produces
#[derive(Debug, Clone)]
pub struct ConfigAggregate {
    raw: Arc<Value>,
    parsed: Arc<RigConfig>,
    resolved_variables: Arc<Mutex<HashMap<String, Value>>>,
    runtime_variables: Arc<Mutex<HashMap<String, Value>>>,
    built_images: Arc<Mutex<HashMap<String, ImageNameTag>>>,
    local_cache: Arc<LocalCache>,
    remote_cache: Arc<RemoteCache>,
    path: PathBuf,
}

impl ConfigAggregate {
    /// Create a new aggregate from the outputs of a config load
    #[must_use]
    #[inline]
    pub fn new(
        raw: Value,
        parsed: RigConfig,
        resolved_variables: HashMap<String, Value>,
        local_cache: Arc<LocalCache>,
        remote_cache: Arc<RemoteCache>,
        path: &Path,
    ) -> Self {
        Self {
            raw: Arc::new(raw),
            parsed: Arc::new(parsed),
            resolved_variables: Arc::new(Mutex::new(resolved_variables)),
            runtime_variables: Arc::new(Mutex::new(HashMap::new())),
            built_images: Arc::new(Mutex::new(HashMap::new())),
            local_cache,
            remote_cache,
            path: path.to_path_buf(),
        }
    }

    /// The fully resolved raw document
    #[must_use]
    #[inline]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The typed parsed config
    #[must_use]
    #[inline]
    pub fn config(&self) -> &RigConfig {
        &self.parsed
    }

    /// Copy-on-write replacement of the parsed config
    ///
    /// Returns a new snapshot; the session maps and caches stay shared,
    /// so variables resolved through either snapshot are visible in both.
    #[must_use]
    #[inline]
    pub fn with_parsed_config(&self, parsed: RigConfig) -> Self {
        let mut copy = self.clone();
        copy.parsed = Arc::new(parsed);
        copy
    }

    /// Snapshot of the resolved variables map
    #[must_use]
    #[inline]
    pub fn variables(&self) -> HashMap<String, Value> {
        self.resolved_variables
            .lock()
            .map(|vars| vars.clone())
            .unwrap_or_default()
    }

    /// Look up a single resolved variable
    #[must_use]
    #[inline]
    pub fn variable(&self, name: &str) -> Option<Value> {
        let vars = self.resolved_variables.lock().ok()?;
        vars.get(name).cloned()
    }

    /// Cache a resolved variable for the remainder of the session
    #[inline]
    pub fn set_variable(&self, name: &str, value: Value) {
        if let Ok(mut vars) = self.resolved_variables.lock() {
            vars.insert(name.to_owned(), value);
        }
    }

    /// Look up an ad-hoc runtime variable published by a pipeline phase
    #[must_use]
    #[inline]
    pub fn runtime_variable(&self, name: &str) -> Option<Value> {
        let vars = self.runtime_variables.lock().ok()?;
        vars.get(name).cloned()
    }

    /// Publish an ad-hoc runtime variable
    #[inline]
    pub fn set_runtime_variable(&self, name: &str, value: Value) {
        if let Ok(mut vars) = self.runtime_variables.lock() {
            vars.insert(name.to_owned(), value);
        }
    }

    /// Snapshot of the images built this run
    #[must_use]
    #[inline]
    pub fn built_images(&self) -> HashMap<String, ImageNameTag> {
        self.built_images
            .lock()
            .map(|images| images.clone())
            .unwrap_or_default()
    }

    /// Record an image built this run, keyed by its config name
    #[inline]
    pub fn set_built_image(&self, image_config_name: &str, image: ImageNameTag) {
        if let Ok(mut images) = self.built_images.lock() {
            images.insert(image_config_name.to_owned(), image);
        }
    }

    /// The local cache attached to this config
    #[must_use]
    #[inline]
    pub fn local_cache(&self) -> &Arc<LocalCache> {
        &self.local_cache
    }

    /// The remote cache attached to this config
    #[must_use]
    #[inline]
    pub fn remote_cache(&self) -> &Arc<RemoteCache> {
        &self.remote_cache
    }

    /// Path of the loaded config file
    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the config file
    #[must_use]
    #[inline]
    pub fn config_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}
