//! Materialised artefacts on the local file system.

use camino::{Utf8Path, Utf8PathBuf};

/// A file produced by extraction and owned by the caller.
///
/// The file is removed only when the output directory is cleared, which is
/// outside the installer's control.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalArtefact {
    path: Utf8PathBuf,
    executable: bool,
}

impl LocalArtefact {
    /// Describe a file at `path`.
    #[must_use]
    pub fn new(path: Utf8PathBuf, executable: bool) -> Self {
        Self { path, executable }
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Whether the file was materialised as a runnable binary.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Whether the file is present on disk right now.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}
