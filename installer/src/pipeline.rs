//! Fetch, extract, and register orchestration.
//!
//! Each toolchain runs its stages strictly in order on its own scoped
//! thread; independent toolchains proceed in parallel and share only the
//! content cache. A toolchain is either fully registered or reported as a
//! [`PipelineError`] naming the stage and artefact that failed.

use std::collections::BTreeSet;
use std::thread;

use camino::Utf8Path;
use log::{debug, info, warn};
use plugstage::{ResolvedSource, ResolvedToolchain};

use crate::artefact::download::{ArtefactDownloader, Deadline};
use crate::artefact::error::ArtefactError;
use crate::artefact::extraction::{
    ArchiveFormat, ArtefactDestination, ArtefactExtractor, ExtractionError,
};
use crate::artefact::fetch::{FetchError, Fetcher};
use crate::artefact::local::LocalArtefact;
use crate::artefact::remote::{RemoteArtefact, validate_name};
use crate::artefact::state::{ArtefactState, Stage};
use crate::cache::ContentCache;
use crate::registry::{ToolchainHandle, ToolchainRegistry, ValidationError, register};

/// One file to materialise: where it comes from and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactRequest {
    remote: RemoteArtefact,
    file_name: String,
}

impl ArtefactRequest {
    /// Pair a descriptor with the file name it is written under.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidName`] if `file_name` is not a single
    /// path component.
    pub fn new(remote: RemoteArtefact, file_name: &str) -> Result<Self, ArtefactError> {
        validate_name(file_name)?;
        Ok(Self {
            remote,
            file_name: file_name.to_owned(),
        })
    }

    /// The remote descriptor.
    #[must_use]
    pub fn remote(&self) -> &RemoteArtefact {
        &self.remote
    }

    /// File name under the toolchain's output directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl TryFrom<&ResolvedSource> for ArtefactRequest {
    type Error = ArtefactError;

    fn try_from(source: &ResolvedSource) -> Result<Self, Self::Error> {
        Self::new(
            RemoteArtefact::new(&source.url, &source.sha256)?,
            &source.file_name,
        )
    }
}

/// Everything needed to materialise one toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainRequest {
    name: String,
    binary: ArtefactRequest,
    manifest: ArtefactRequest,
}

impl ToolchainRequest {
    /// Describe toolchain `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidName`] if `name` is not a single path
    /// component.
    pub fn new(
        name: &str,
        binary: ArtefactRequest,
        manifest: ArtefactRequest,
    ) -> Result<Self, ArtefactError> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_owned(),
            binary,
            manifest,
        })
    }

    /// Logical toolchain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compressed plugin binary.
    #[must_use]
    pub fn binary(&self) -> &ArtefactRequest {
        &self.binary
    }

    /// The manifest sidecar.
    #[must_use]
    pub fn manifest(&self) -> &ArtefactRequest {
        &self.manifest
    }
}

impl TryFrom<&ResolvedToolchain> for ToolchainRequest {
    type Error = ArtefactError;

    fn try_from(toolchain: &ResolvedToolchain) -> Result<Self, Self::Error> {
        Self::new(
            &toolchain.name,
            ArtefactRequest::try_from(&toolchain.binary)?,
            ArtefactRequest::try_from(&toolchain.manifest)?,
        )
    }
}

/// Context for a pipeline run.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    /// Downloader shared by all toolchains.
    pub downloader: &'a (dyn ArtefactDownloader + Sync),
    /// Extractor shared by all toolchains.
    pub extractor: &'a (dyn ArtefactExtractor + Sync),
    /// Content cache, if enabled.
    pub cache: Option<&'a ContentCache>,
    /// Root of the `<output_dir>/<name>/<file_name>` layout.
    pub output_dir: &'a Utf8Path,
    /// Point after which network reads are abandoned.
    pub deadline: Option<Deadline>,
}

/// A toolchain that could not be materialised.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Download or checksum verification failed.
    #[error("toolchain {toolchain}: fetch of {artefact} failed: {source}")]
    Fetch {
        /// The toolchain being materialised.
        toolchain: String,
        /// URL of the failing artefact.
        artefact: String,
        /// What went wrong.
        #[source]
        source: FetchError,
    },

    /// Decompression or writing failed.
    #[error("toolchain {toolchain}: extraction of {artefact} failed: {source}")]
    Extract {
        /// The toolchain being materialised.
        toolchain: String,
        /// File name of the failing artefact.
        artefact: String,
        /// What went wrong.
        #[source]
        source: ExtractionError,
    },

    /// The staged files could not be registered.
    #[error("toolchain {toolchain}: registration failed: {source}")]
    Register {
        /// The toolchain being registered.
        toolchain: String,
        /// What went wrong.
        #[source]
        source: ValidationError,
    },
}

impl PipelineError {
    /// The stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch { .. } => Stage::Fetch,
            Self::Extract { .. } => Stage::Extract,
            Self::Register { .. } => Stage::Register,
        }
    }

    /// The toolchain that failed.
    #[must_use]
    pub fn toolchain(&self) -> &str {
        match self {
            Self::Fetch { toolchain, .. }
            | Self::Extract { toolchain, .. }
            | Self::Register { toolchain, .. } => toolchain,
        }
    }

    /// Whether rerunning the pipeline could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { source, .. } if source.is_transient())
    }
}

/// Tracks one toolchain through [`ArtefactState`].
struct Progress<'a> {
    toolchain: &'a str,
    state: ArtefactState,
}

impl<'a> Progress<'a> {
    fn new(toolchain: &'a str) -> Self {
        Self {
            toolchain,
            state: ArtefactState::Declared,
        }
    }

    fn advance(&mut self) {
        match self.state.advance() {
            Ok(next) => {
                debug!("{}: {} -> {next}", self.toolchain, self.state);
                self.state = next;
            }
            Err(err) => warn!("{}: {err}", self.toolchain),
        }
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        match self.state.fail() {
            Ok(next) => {
                debug!("{}: {} -> {next}", self.toolchain, self.state);
                self.state = next;
            }
            Err(state_err) => warn!("{}: {state_err}", self.toolchain),
        }
        err
    }
}

/// Fetch, extract, and register one toolchain.
///
/// The binary is gzip-decompressed into an executable; the manifest is
/// staged verbatim. Rerunning with the same inputs leaves the output
/// directory unchanged.
///
/// # Errors
///
/// Returns a [`PipelineError`] naming the first stage that failed.
pub fn materialise(
    request: &ToolchainRequest,
    context: &PipelineContext<'_>,
) -> Result<ToolchainHandle, PipelineError> {
    let name = request.name();
    let mut progress = Progress::new(name);

    progress.advance();
    let mut fetcher = Fetcher::new(context.downloader).with_deadline(context.deadline);
    if let Some(cache) = context.cache {
        fetcher = fetcher.with_cache(cache);
    }
    let fetch = |artefact: &ArtefactRequest| {
        fetcher
            .fetch(artefact.remote())
            .map_err(|source| PipelineError::Fetch {
                toolchain: name.to_owned(),
                artefact: artefact.remote().url().to_owned(),
                source,
            })
    };
    let binary_bytes = fetch(request.binary()).map_err(|e| progress.fail(e))?;
    let manifest_bytes = fetch(request.manifest()).map_err(|e| progress.fail(e))?;
    progress.advance();

    progress.advance();
    let extract = |artefact: &ArtefactRequest, bytes: &[u8], format: ArchiveFormat| {
        stage_file(context, name, artefact, bytes, format).map_err(|source| {
            PipelineError::Extract {
                toolchain: name.to_owned(),
                artefact: artefact.file_name().to_owned(),
                source,
            }
        })
    };
    let binary = extract(request.binary(), &binary_bytes, ArchiveFormat::Gzip)
        .map_err(|e| progress.fail(e))?;
    let manifest = extract(request.manifest(), &manifest_bytes, ArchiveFormat::Plain)
        .map_err(|e| progress.fail(e))?;
    progress.advance();

    let handle = register(name, binary, manifest).map_err(|source| {
        progress.fail(PipelineError::Register {
            toolchain: name.to_owned(),
            source,
        })
    })?;
    progress.advance();

    info!("{name}: registered {}", handle.artefact().path());
    Ok(handle)
}

fn stage_file(
    context: &PipelineContext<'_>,
    toolchain: &str,
    artefact: &ArtefactRequest,
    bytes: &[u8],
    format: ArchiveFormat,
) -> Result<LocalArtefact, ExtractionError> {
    let destination = ArtefactDestination::new(context.output_dir, toolchain, artefact.file_name())?;
    context.extractor.extract(bytes, format, &destination)
}

/// Materialise every request in parallel and register the results.
///
/// All toolchains run to completion even when some fail, so every failure
/// is reported at once.
///
/// # Errors
///
/// Returns every [`PipelineError`] if any toolchain failed, including a
/// [`ValidationError::DuplicateToolchain`] for repeated names.
pub fn materialise_all(
    requests: &[ToolchainRequest],
    context: &PipelineContext<'_>,
) -> Result<ToolchainRegistry, Vec<PipelineError>> {
    let duplicates = duplicate_names(requests);
    if !duplicates.is_empty() {
        return Err(duplicates
            .into_iter()
            .map(|name| PipelineError::Register {
                toolchain: name.clone(),
                source: ValidationError::DuplicateToolchain { name },
            })
            .collect());
    }

    let results: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = requests
            .iter()
            .map(|request| scope.spawn(move || materialise(request, context)))
            .collect();
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let mut registry = ToolchainRegistry::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(handle) => {
                let toolchain = handle.name().to_owned();
                if let Err(source) = registry.insert(handle) {
                    failures.push(PipelineError::Register { toolchain, source });
                }
            }
            Err(err) => failures.push(err),
        }
    }

    if failures.is_empty() {
        Ok(registry)
    } else {
        Err(failures)
    }
}

fn duplicate_names(requests: &[ToolchainRequest]) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    requests
        .iter()
        .filter(|request| !seen.insert(request.name()))
        .map(|request| request.name().to_owned())
        .collect()
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
