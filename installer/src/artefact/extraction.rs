//! Single-file archive extraction for plugin artefacts.
//!
//! Plugin binaries ship as one gzip stream wrapping one executable. The
//! extractor decompresses the stream into a deterministic location derived
//! from the toolchain name, so extracting the same bytes twice leaves the
//! file untouched.

use std::borrow::Cow;
use std::fs;
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::bufread::GzDecoder;
use log::debug;

use super::error::ArtefactError;
use super::local::LocalArtefact;
use super::remote::validate_name;

/// Permission bits given to extracted plugin binaries.
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// How the fetched bytes are packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// A single gzip stream wrapping the plugin binary.
    Gzip,
    /// Uncompressed content staged as-is, such as the manifest.
    Plain,
}

/// Deterministic destination of an extracted artefact:
/// `<output_root>/<toolchain>/<file_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactDestination {
    dir: Utf8PathBuf,
    file_name: String,
}

impl ArtefactDestination {
    /// Destination for `file_name` of toolchain `toolchain` under `output_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidName`] if either name is not a single
    /// path component.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use plugstage_installer::artefact::extraction::ArtefactDestination;
    ///
    /// let destination =
    ///     ArtefactDestination::new(Utf8Path::new("/opt/plugins"), "protobuf", "plugin")
    ///         .expect("valid names");
    /// assert_eq!(destination.path(), Utf8Path::new("/opt/plugins/protobuf/plugin"));
    /// ```
    pub fn new(
        output_root: &Utf8Path,
        toolchain: &str,
        file_name: &str,
    ) -> Result<Self, ArtefactError> {
        validate_name(toolchain)?;
        validate_name(file_name)?;
        Ok(Self {
            dir: output_root.join(toolchain),
            file_name: file_name.to_owned(),
        })
    }

    /// Full path of the extracted file.
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Directory the file is written into.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

/// Trait for extracting fetched bytes to disk, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Write the content of `bytes` to `destination`.
    ///
    /// [`ArchiveFormat::Gzip`] content is decompressed and always marked
    /// executable; [`ArchiveFormat::Plain`] content is written verbatim and
    /// not executable.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::CorruptArchive`] if decompression fails
    /// and [`ExtractionError::Io`] if the file cannot be written.
    fn extract(
        &self,
        bytes: &[u8],
        format: ArchiveFormat,
        destination: &ArtefactDestination,
    ) -> Result<LocalArtefact, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The archive could not be decompressed. After a successful checksum
    /// check this indicates the published artefact itself is broken.
    #[error("corrupt archive for {path}: {reason}")]
    CorruptArchive {
        /// The destination being extracted to.
        path: Utf8PathBuf,
        /// Description of the decompression failure.
        reason: String,
    },

    /// I/O error writing the extracted file.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The destination names do not form a valid path.
    #[error("invalid destination: {0}")]
    InvalidDestination(#[from] ArtefactError),
}

/// Default extractor backed by `flate2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl ArtefactExtractor for FileExtractor {
    fn extract(
        &self,
        bytes: &[u8],
        format: ArchiveFormat,
        destination: &ArtefactDestination,
    ) -> Result<LocalArtefact, ExtractionError> {
        let path = destination.path();
        let (content, executable) = match format {
            ArchiveFormat::Gzip => (Cow::Owned(decompress_gzip(bytes, &path)?), true),
            ArchiveFormat::Plain => (Cow::Borrowed(bytes), false),
        };

        write_if_changed(destination.dir(), &path, &content, executable).map_err(|source| {
            ExtractionError::Io {
                path: path.clone(),
                source,
            }
        })?;

        Ok(LocalArtefact::new(path, executable))
    }
}

/// Decompress exactly one gzip stream, refusing empty or truncated input
/// and any bytes after the stream's trailer.
fn decompress_gzip(bytes: &[u8], path: &Utf8Path) -> Result<Vec<u8>, ExtractionError> {
    let corrupt = |reason: String| ExtractionError::CorruptArchive {
        path: path.to_owned(),
        reason,
    };

    if bytes.is_empty() {
        return Err(corrupt("archive is empty".to_owned()));
    }

    let mut content = Vec::new();
    let mut decoder = GzDecoder::new(bytes);
    decoder
        .read_to_end(&mut content)
        .map_err(|e| corrupt(e.to_string()))?;

    let trailing = decoder.into_inner().len();
    if trailing > 0 {
        return Err(corrupt(format!(
            "{trailing} unexpected bytes after the gzip stream"
        )));
    }
    Ok(content)
}

/// Replace `path` with `content` unless it already holds exactly that.
///
/// New content goes to a temporary file beside the target and is renamed
/// over it, so a concurrent reader sees either the old or the new file.
fn write_if_changed(
    dir: &Utf8Path,
    path: &Utf8Path,
    content: &[u8],
    executable: bool,
) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;

    match fs::read(path) {
        Ok(existing) if existing == content => {
            debug!("{path} is up to date");
            return set_permissions(path.as_std_path(), executable);
        }
        Ok(_) => debug!("replacing {path}"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(content)?;
    staged.as_file().sync_all()?;
    set_permissions(staged.path(), executable)?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_permissions(path: &std::path::Path, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if executable { EXECUTABLE_MODE } else { 0o644 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &std::path::Path, _executable: bool) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
