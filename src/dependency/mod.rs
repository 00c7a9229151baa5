//! Dependency projects
//!
//! A dependency is another devrig project whose config is loaded alongside
//! the parent. Dependencies form a DAG; a dependency may itself contain
//! nested dependencies. The variable resolver addresses them by name through
//! `runtime.dependencies.NAME.*` and `NAME.imageKey` helper references.

use crate::config::ConfigAggregate;
use std::path::PathBuf;

/// A loaded dependency project
#[derive(Debug, Clone)]
pub struct Dependency {
    name: String,
    local_path: PathBuf,
    config: ConfigAggregate,
    children: Vec<Dependency>,
}

impl Dependency {
    /// Create a new dependency from its loaded config
    #[must_use]
    #[inline]
    pub fn new(
        name: &str,
        local_path: PathBuf,
        config: ConfigAggregate,
        children: Vec<Dependency>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            local_path,
            config,
            children,
        }
    }

    /// The dependency's name as referenced from the parent config
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local checkout path of the dependency project
    #[must_use]
    #[inline]
    pub fn local_path(&self) -> &PathBuf {
        &self.local_path
    }

    /// The dependency's own loaded config
    #[must_use]
    #[inline]
    pub fn config(&self) -> &ConfigAggregate {
        &self.config
    }

    /// Nested dependencies of this dependency
    #[must_use]
    #[inline]
    pub fn children(&self) -> &[Dependency] {
        &self.children
    }
}

/// Find a dependency by name in a loaded dependency list
#[must_use]
#[inline]
pub fn find<'a>(dependencies: &'a [Dependency], name: &str) -> Option<&'a Dependency> {
    dependencies.iter().find(|dep| dep.name() == name)
}
