//! Checksum-verified artefact fetching.
//!
//! [`Fetcher`] turns a [`RemoteArtefact`] into bytes whose SHA-256 matches
//! the descriptor, consulting the content cache first and populating it
//! after a verified download.

use log::{debug, info};

use super::download::{ArtefactDownloader, Deadline, DownloadError};
use super::remote::RemoteArtefact;
use super::sha256_digest::Sha256Digest;
use crate::cache::ContentCache;

/// Errors arising from fetching an artefact.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The host was unreachable, answered with a failure, or the deadline
    /// passed. The caller may retry the whole fetch.
    #[error("network error: {0}")]
    Network(#[from] DownloadError),

    /// The downloaded bytes do not hash to the expected checksum.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    Integrity {
        /// The URL that was downloaded.
        url: String,
        /// The checksum from the descriptor.
        expected: Sha256Digest,
        /// The checksum of the received bytes.
        actual: Sha256Digest,
    },

    /// The content cache could not be read or written.
    #[error("cache error at {path}: {source}")]
    Cache {
        /// The cache directory.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Whether retrying the same fetch could succeed.
    ///
    /// Integrity failures are never transient: retrying with the same
    /// inputs would fetch the same wrong bytes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Downloads artefacts and verifies them against their descriptors.
pub struct Fetcher<'a> {
    downloader: &'a dyn ArtefactDownloader,
    cache: Option<&'a ContentCache>,
    deadline: Option<Deadline>,
}

impl<'a> Fetcher<'a> {
    /// Create a fetcher with no cache and no deadline.
    #[must_use]
    pub fn new(downloader: &'a dyn ArtefactDownloader) -> Self {
        Self {
            downloader,
            cache: None,
            deadline: None,
        }
    }

    /// Reuse and populate `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: &'a ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Abort network reads once `deadline` passes.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Return the verified content of `artefact`.
    ///
    /// Calling this twice with the same descriptor returns byte-identical
    /// content; with a cache the second call does not touch the network.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] when the download fails,
    /// [`FetchError::Integrity`] when the checksum does not match, and
    /// [`FetchError::Cache`] when the cache cannot be used.
    pub fn fetch(&self, artefact: &RemoteArtefact) -> Result<Vec<u8>, FetchError> {
        let Some(cache) = self.cache else {
            return self.download_verified(artefact);
        };

        let digest = artefact.expected_checksum();
        if let Some(bytes) = cache.get(digest).map_err(|e| cache_error(cache, e))? {
            return Ok(bytes);
        }

        let _lock = cache
            .lock(digest, self.deadline)
            .map_err(|e| lock_error(cache, artefact, e))?;
        // Another process may have filled the entry while we waited.
        if let Some(bytes) = cache.get(digest).map_err(|e| cache_error(cache, e))? {
            return Ok(bytes);
        }

        let bytes = self.download_verified(artefact)?;
        cache
            .put(digest, &bytes)
            .map_err(|e| cache_error(cache, e))?;
        Ok(bytes)
    }

    fn download_verified(&self, artefact: &RemoteArtefact) -> Result<Vec<u8>, FetchError> {
        info!("Downloading {}", artefact.url());
        let bytes = self.downloader.download(artefact.url(), self.deadline)?;
        verify(artefact, &bytes)?;
        debug!(
            "verified {} bytes from {} against {}",
            bytes.len(),
            artefact.url(),
            artefact.expected_checksum()
        );
        Ok(bytes)
    }
}

/// Check `bytes` against the descriptor's checksum.
///
/// # Errors
///
/// Returns [`FetchError::Integrity`] on mismatch.
pub fn verify(artefact: &RemoteArtefact, bytes: &[u8]) -> Result<(), FetchError> {
    let actual = Sha256Digest::of(bytes);
    if &actual != artefact.expected_checksum() {
        return Err(FetchError::Integrity {
            url: artefact.url().to_owned(),
            expected: artefact.expected_checksum().clone(),
            actual,
        });
    }
    Ok(())
}

fn cache_error(cache: &ContentCache, source: std::io::Error) -> FetchError {
    FetchError::Cache {
        path: cache.root().to_string(),
        source,
    }
}

/// Running out of time while another installer holds the lock is the same
/// transient failure as a slow download.
fn lock_error(
    cache: &ContentCache,
    artefact: &RemoteArtefact,
    source: std::io::Error,
) -> FetchError {
    if source.kind() == std::io::ErrorKind::TimedOut {
        FetchError::Network(DownloadError::DeadlineExceeded {
            url: artefact.url().to_owned(),
        })
    } else {
        cache_error(cache, source)
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
