//! Toolchain registration.
//!
//! Registration binds an extracted plugin binary and its manifest into a
//! [`ToolchainHandle`] that later build steps look up by logical name.
//! Both files must already be on disk; nothing is retried.

use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::artefact::local::LocalArtefact;
use crate::artefact::manifest::{PluginManifest, parse_manifest};
use crate::artefact::remote::validate_name;

/// Errors arising from registration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The logical name is not usable.
    #[error("invalid toolchain name \"{name}\": {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An input file does not exist.
    #[error("toolchain {toolchain}: {path} does not exist")]
    MissingArtefact {
        /// The toolchain being registered.
        toolchain: String,
        /// The missing file.
        path: String,
    },

    /// The plugin binary cannot be run.
    #[error("toolchain {toolchain}: {path} is not executable")]
    NotExecutable {
        /// The toolchain being registered.
        toolchain: String,
        /// The binary.
        path: String,
    },

    /// The manifest could not be read or parsed.
    #[error("toolchain {toolchain}: invalid manifest: {reason}")]
    InvalidManifest {
        /// The toolchain being registered.
        toolchain: String,
        /// Read or parse failure.
        reason: String,
    },

    /// A handle with this name is already registered.
    #[error("toolchain {name} is already registered")]
    DuplicateToolchain {
        /// The repeated name.
        name: String,
    },
}

/// A materialised toolchain, queryable by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainHandle {
    name: String,
    artefact: LocalArtefact,
    manifest: LocalArtefact,
    plugin_manifest: PluginManifest,
}

impl ToolchainHandle {
    /// Logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin binary.
    #[must_use]
    pub fn artefact(&self) -> &LocalArtefact {
        &self.artefact
    }

    /// The manifest file.
    #[must_use]
    pub fn manifest(&self) -> &LocalArtefact {
        &self.manifest
    }

    /// The parsed manifest.
    #[must_use]
    pub fn plugin_manifest(&self) -> &PluginManifest {
        &self.plugin_manifest
    }

    /// Entry point declared by the manifest.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        self.plugin_manifest.entry_point()
    }

    /// Plugin-specific configuration declared by the manifest.
    #[must_use]
    pub fn plugin_config(&self) -> &Map<String, Value> {
        self.plugin_manifest.plugin_config()
    }
}

/// Bind `artefact` and `manifest` into a handle named `name`.
///
/// # Errors
///
/// Returns [`ValidationError`] if the name is invalid, either file is
/// missing, the binary is not executable, or the manifest does not parse.
pub fn register(
    name: &str,
    artefact: LocalArtefact,
    manifest: LocalArtefact,
) -> Result<ToolchainHandle, ValidationError> {
    validate_name(name).map_err(|err| ValidationError::InvalidName {
        name: name.to_owned(),
        reason: err.to_string(),
    })?;

    for file in [&artefact, &manifest] {
        if !file.exists() {
            return Err(ValidationError::MissingArtefact {
                toolchain: name.to_owned(),
                path: file.path().to_string(),
            });
        }
    }

    if !artefact.is_executable() || !has_execute_bits(artefact.path()) {
        return Err(ValidationError::NotExecutable {
            toolchain: name.to_owned(),
            path: artefact.path().to_string(),
        });
    }

    let invalid_manifest = |reason: String| ValidationError::InvalidManifest {
        toolchain: name.to_owned(),
        reason,
    };
    let json = fs::read_to_string(manifest.path()).map_err(|e| invalid_manifest(e.to_string()))?;
    let plugin_manifest = parse_manifest(&json).map_err(|e| invalid_manifest(e.to_string()))?;

    if artefact.path().file_name() != Some(plugin_manifest.entry_point()) {
        warn!(
            "toolchain {name}: manifest entry point {} differs from binary {}",
            plugin_manifest.entry_point(),
            artefact.path()
        );
    }

    debug!("registered toolchain {name} at {}", artefact.path());
    Ok(ToolchainHandle {
        name: name.to_owned(),
        artefact,
        manifest,
        plugin_manifest,
    })
}

#[cfg(unix)]
fn has_execute_bits(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path).is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn has_execute_bits(_path: &Utf8Path) -> bool {
    true
}

/// Registered toolchains keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolchainRegistry {
    handles: BTreeMap<String, ToolchainHandle>,
}

impl ToolchainRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the files as `name` and store the resulting handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`register`], and
    /// [`ValidationError::DuplicateToolchain`] if `name` is already taken.
    pub fn register(
        &mut self,
        name: &str,
        artefact: LocalArtefact,
        manifest: LocalArtefact,
    ) -> Result<&ToolchainHandle, ValidationError> {
        if self.handles.contains_key(name) {
            return Err(ValidationError::DuplicateToolchain {
                name: name.to_owned(),
            });
        }
        let handle = register(name, artefact, manifest)?;
        self.insert(handle)
    }

    /// Store an already registered handle.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateToolchain`] if the name is taken.
    pub fn insert(&mut self, handle: ToolchainHandle) -> Result<&ToolchainHandle, ValidationError> {
        use std::collections::btree_map::Entry;

        match self.handles.entry(handle.name.clone()) {
            Entry::Occupied(entry) => Err(ValidationError::DuplicateToolchain {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => Ok(entry.insert(handle)),
        }
    }

    /// Look up a toolchain by logical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolchainHandle> {
        self.handles.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// Handles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolchainHandle> {
        self.handles.values()
    }

    /// Number of registered toolchains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
