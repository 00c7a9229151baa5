//! Persisted local and remote caches
//!
//! The local cache stores resolved variable answers and per-image build
//! results (`.devrig/cache.yaml` next to the config); the remote cache
//! stores per-deployment records (`.devrig/remote.yaml`). An unreadable or
//! corrupt cache file is treated as a cache miss, never as a fatal error:
//! the first load after corruption simply re-resolves and re-prompts.

use crate::system::System;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Cache entry for a single image, keyed by the image's config name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageCache {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_config_hash: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_files_hash: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub local_registry_image_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

impl ImageCache {
    /// The image name deploys should reference
    ///
    /// Prefers the local registry name when the image was pushed there.
    #[must_use]
    #[inline]
    pub fn resolve_image(&self) -> &str {
        if self.local_registry_image_name.is_empty() {
            &self.image_name
        } else {
            &self.local_registry_image_name
        }
    }
}

/// Cache entry for a single deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentCache {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deployment_config_hash: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct LocalCacheData {
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    vars: HashMap<String, String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    images: HashMap<String, ImageCache>,

    // arbitrary key value cache
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    data: HashMap<String, String>,
}

/// The per-project local cache, mutex guarded for concurrent readers
#[derive(Debug)]
pub struct LocalCache {
    data: Mutex<LocalCacheData>,
    path: PathBuf,
}

impl LocalCache {
    /// Load the cache from disk, falling back to an empty cache
    #[must_use]
    #[inline]
    pub fn load(system: &dyn System, path: &Path) -> Self {
        let data = if system.is_file(path) {
            match system
                .read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|content| {
                    serde_yaml::from_str::<LocalCacheData>(&content).map_err(Into::into)
                }) {
                Ok(data) => data,
                Err(err) => {
                    warn!(
                        "Discarding unreadable cache file {}: {err}",
                        path.display()
                    );
                    LocalCacheData::default()
                }
            }
        } else {
            LocalCacheData::default()
        };

        Self {
            data: Mutex::new(data),
            path: path.to_path_buf(),
        }
    }

    /// Create an empty in-memory cache that persists to `path`
    #[must_use]
    #[inline]
    pub fn empty(path: &Path) -> Self {
        Self {
            data: Mutex::new(LocalCacheData::default()),
            path: path.to_path_buf(),
        }
    }

    /// Get a cached variable answer
    #[must_use]
    #[inline]
    pub fn get_var(&self, name: &str) -> Option<String> {
        let data = self.data.lock().ok()?;
        data.vars.get(name).cloned()
    }

    /// Cache a variable answer
    #[inline]
    pub fn set_var(&self, name: &str, value: &str) {
        if let Ok(mut data) = self.data.lock() {
            data.vars.insert(name.to_owned(), value.to_owned());
        }
    }

    /// List all cached variable answers
    #[must_use]
    #[inline]
    pub fn list_vars(&self) -> HashMap<String, String> {
        self.data
            .lock()
            .map(|data| data.vars.clone())
            .unwrap_or_default()
    }

    /// Get the cache entry for an image config name
    #[must_use]
    #[inline]
    pub fn get_image_cache(&self, image_config_name: &str) -> Option<ImageCache> {
        let data = self.data.lock().ok()?;
        data.images.get(image_config_name).cloned()
    }

    /// Create or update the cache entry for an image config name
    #[inline]
    pub fn set_image_cache(&self, image_config_name: &str, image_cache: ImageCache) {
        if let Ok(mut data) = self.data.lock() {
            data.images.insert(image_config_name.to_owned(), image_cache);
        }
    }

    /// Snapshot of all image cache entries
    #[must_use]
    #[inline]
    pub fn list_image_cache(&self) -> HashMap<String, ImageCache> {
        self.data
            .lock()
            .map(|data| data.images.clone())
            .unwrap_or_default()
    }

    /// Get an arbitrary cached value
    #[must_use]
    #[inline]
    pub fn get_data(&self, key: &str) -> Option<String> {
        let data = self.data.lock().ok()?;
        data.data.get(key).cloned()
    }

    /// Set an arbitrary cached value
    #[inline]
    pub fn set_data(&self, key: &str, value: &str) {
        if let Ok(mut data) = self.data.lock() {
            data.data.insert(key.to_owned(), value.to_owned());
        }
    }

    /// Persist the cache to its file
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or the
    /// file cannot be written.
    #[inline]
    pub fn save(&self, system: &dyn System) -> Result<()> {
        let snapshot = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("cache lock poisoned: {e}"))?
            .clone();

        let content = serde_yaml::to_string(&snapshot).context("Failed to serialize cache")?;
        if let Some(parent) = self.path.parent() {
            system
                .create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
        }
        system
            .write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RemoteCacheData {
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    deployments: HashMap<String, DeploymentCache>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    data: HashMap<String, String>,
}

/// Cache of state produced by deploys, persisted separately from the local cache
#[derive(Debug)]
pub struct RemoteCache {
    data: Mutex<RemoteCacheData>,
    path: PathBuf,
}

impl RemoteCache {
    /// Load the cache from disk, falling back to an empty cache
    #[must_use]
    #[inline]
    pub fn load(system: &dyn System, path: &Path) -> Self {
        let data = if system.is_file(path) {
            match system
                .read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|content| {
                    serde_yaml::from_str::<RemoteCacheData>(&content).map_err(Into::into)
                }) {
                Ok(data) => data,
                Err(err) => {
                    warn!(
                        "Discarding unreadable remote cache file {}: {err}",
                        path.display()
                    );
                    RemoteCacheData::default()
                }
            }
        } else {
            RemoteCacheData::default()
        };

        Self {
            data: Mutex::new(data),
            path: path.to_path_buf(),
        }
    }

    /// Get the cache entry for a deployment name
    #[must_use]
    #[inline]
    pub fn get_deployment_cache(&self, deployment_name: &str) -> Option<DeploymentCache> {
        let data = self.data.lock().ok()?;
        data.deployments.get(deployment_name).cloned()
    }

    /// Create or update the cache entry for a deployment name
    #[inline]
    pub fn set_deployment_cache(&self, deployment_name: &str, cache: DeploymentCache) {
        if let Ok(mut data) = self.data.lock() {
            data.deployments.insert(deployment_name.to_owned(), cache);
        }
    }

    /// Persist the cache to its file
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or the
    /// file cannot be written.
    #[inline]
    pub fn save(&self, system: &dyn System) -> Result<()> {
        let snapshot = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("cache lock poisoned: {e}"))?
            .clone();

        let content =
            serde_yaml::to_string(&snapshot).context("Failed to serialize remote cache")?;
        if let Some(parent) = self.path.parent() {
            system
                .create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
        }
        system
            .write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))
    }
}
