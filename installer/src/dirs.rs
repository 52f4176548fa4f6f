//! Directory resolution abstraction for platform-specific paths.
//!
//! [`BaseDirs`] is the seam between the installer and the platform's
//! per-user directories, so tests can substitute fixed locations.

use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use directories_next::ProjectDirs;

use crate::error::{InstallerError, Result};

/// Environment variable overriding the default cache directory.
pub const CACHE_DIR_ENV: &str = "PLUGSTAGE_CACHE_DIR";

/// Platform directories the installer falls back to.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Per-user cache directory for plugstage, if any.
    fn cache_dir(&self) -> Option<PathBuf>;

    /// Per-user data directory for plugstage, if any.
    fn data_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
///
/// `PLUGSTAGE_CACHE_DIR` takes precedence over the platform cache
/// directory so CI runners can point every job at one shared cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBaseDirs;

impl SystemBaseDirs {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "plugstage")
    }
}

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|value| !value.is_empty()) {
            return Some(PathBuf::from(dir));
        }
        Self::project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
    }

    fn data_dir(&self) -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }
}

/// The cache directory: `explicit` if given, else the platform default.
///
/// # Errors
///
/// Returns [`InstallerError::DirectoryUnavailable`] when no default exists
/// or it is not valid UTF-8.
pub fn resolve_cache_dir(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_owned()),
        None => utf8_dir("cache", dirs.cache_dir()),
    }
}

/// The output directory: `explicit` if given, else
/// `<platform data dir>/toolchains`.
///
/// # Errors
///
/// Returns [`InstallerError::DirectoryUnavailable`] when no default exists
/// or it is not valid UTF-8.
pub fn resolve_output_dir(
    explicit: Option<&Utf8Path>,
    dirs: &dyn BaseDirs,
) -> Result<Utf8PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_owned()),
        None => utf8_dir("output", dirs.data_dir()).map(|dir| dir.join("toolchains")),
    }
}

fn utf8_dir(purpose: &'static str, dir: Option<PathBuf>) -> Result<Utf8PathBuf> {
    let dir = dir.ok_or_else(|| InstallerError::DirectoryUnavailable {
        purpose,
        reason: "no platform default is available".to_owned(),
    })?;
    Utf8PathBuf::from_path_buf(dir).map_err(|path| InstallerError::DirectoryUnavailable {
        purpose,
        reason: format!("{} is not valid UTF-8", path.display()),
    })
}
