//! Package descriptors and their discovery under a registry root.

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;

/// File name of a package descriptor.
pub const META_FILE: &str = "meta.yaml";

/// Package index a record can declare an install identifier for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstallTarget {
    Pypi,
    Conda,
    Cran,
}

impl InstallTarget {
    /// Key under `install` in the descriptor.
    pub fn key(&self) -> &'static str {
        match self {
            InstallTarget::Pypi => "pypi",
            InstallTarget::Conda => "conda",
            InstallTarget::Cran => "cran",
        }
    }
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A descriptor file found under the registry root, not yet parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPackage {
    pub id: String,
    pub meta_path: PathBuf,
}

impl DiscoveredPackage {
    /// Reads and parses the descriptor.
    pub fn load(&self) -> Result<PackageRecord, ValidationError> {
        let unreadable = |reason: String| ValidationError::MetadataUnreadable {
            path: self.meta_path.clone(),
            reason,
        };

        let text =
            std::fs::read_to_string(&self.meta_path).map_err(|e| unreadable(e.to_string()))?;
        let meta: Value = serde_yaml::from_str(&text).map_err(|e| unreadable(e.to_string()))?;

        let dir = self
            .meta_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(PackageRecord::new(self.id.clone(), dir, meta))
    }
}

/// Finds every descriptor under `registry_dir`, sorted by package id.
///
/// The package id is the name of the directory holding the descriptor.
#[tracing::instrument]
pub fn discover(registry_dir: &Path) -> Result<Vec<DiscoveredPackage>> {
    if !registry_dir.is_dir() {
        anyhow::bail!("Invalid registry directory: {}", registry_dir.display());
    }

    let root = registry_dir
        .to_str()
        .ok_or_else(|| anyhow!("Registry path is not valid UTF-8: {}", registry_dir.display()))?;
    let pattern = format!("{}/**/{}", glob::Pattern::escape(root), META_FILE);

    let mut packages = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid registry glob pattern")? {
        let meta_path = entry.context("Failed to read registry entry")?;
        let Some(id) = meta_path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
        else {
            continue;
        };
        debug!("Found {} at {}", id, meta_path.display());
        packages.push(DiscoveredPackage {
            id: id.to_string(),
            meta_path,
        });
    }

    packages.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.meta_path.cmp(&b.meta_path)));
    Ok(packages)
}

/// One package's metadata, kept as an ordered JSON value so every field
/// survives to the output untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
    id: String,
    dir: PathBuf,
    meta: Value,
}

impl PackageRecord {
    pub fn new(id: impl Into<String>, dir: impl Into<PathBuf>, meta: Value) -> Self {
        Self {
            id: id.into(),
            dir: dir.into(),
            meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory holding the descriptor; relative logo paths resolve against it.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn meta(&self) -> &Value {
        &self.meta
    }

    pub fn into_meta(self) -> Value {
        self.meta
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    pub fn project_home(&self) -> Option<&str> {
        self.str_field("project_home")
    }

    pub fn documentation_home(&self) -> Option<&str> {
        self.str_field("documentation_home")
    }

    pub fn tutorials_home(&self) -> Option<&str> {
        self.str_field("tutorials_home")
    }

    /// GitHub usernames listed under `contact`. Non-string entries are skipped.
    pub fn contact(&self) -> Vec<String> {
        self.meta
            .get("contact")
            .and_then(Value::as_array)
            .map(|users| {
                users
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Identifier declared for `target` under `install`, if any.
    pub fn install(&self, target: InstallTarget) -> Option<&str> {
        self.meta
            .get("install")
            .and_then(|install| install.get(target.key()))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn logo(&self) -> Option<&str> {
        self.str_field("logo")
    }

    /// Replaces the `logo` field. No-op if the descriptor is not a mapping.
    pub fn set_logo(&mut self, logo: impl Into<String>) {
        if let Some(map) = self.meta.as_object_mut() {
            map.insert("logo".to_string(), Value::String(logo.into()));
        }
    }
}
