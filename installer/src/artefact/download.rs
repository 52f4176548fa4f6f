//! Artefact download transport.
//!
//! Provides a trait-based abstraction for retrieving raw artefact bytes,
//! enabling dependency injection for testing. The HTTP implementation also
//! reads `file://` URLs so local mirrors need no web server.

use std::io::Read;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::debug;

/// Network timeout applied when the caller supplies no deadline.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// A point in time after which a download must be abandoned.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use plugstage_installer::artefact::download::Deadline;
///
/// let deadline = Deadline::after(Duration::from_secs(30)).expect("representable");
/// assert!(deadline.remaining().is_some());
/// assert!(Deadline::after(Duration::MAX).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `timeout` from now, or `None` when that instant is too far
    /// away to represent.
    #[must_use]
    pub fn after(timeout: Duration) -> Option<Self> {
        Instant::now().checked_add(timeout).map(Self)
    }

    /// A deadline at the given instant.
    #[must_use]
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Time left before the deadline, or `None` once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }
}

/// Trait for downloading artefact bytes.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactDownloader {
    /// Download the body at `url`, giving up when `deadline` passes.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] if the host is unreachable, the response
    /// is not a success, the deadline passes, or the body cannot be read.
    fn download(&self, url: &str, deadline: Option<Deadline>) -> Result<Vec<u8>, DownloadError>;
}

/// Errors arising from artefact download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The caller's deadline passed before the body was received.
    #[error("deadline exceeded while downloading {url}")]
    DeadlineExceeded {
        /// The URL being downloaded.
        url: String,
    },

    /// A `file://` artefact could not be read.
    #[error("failed to read {url}: {source}")]
    Io {
        /// The URL being read.
        url: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Downloader using `ureq` for HTTP(S) and the file system for `file://`.
#[derive(Debug, Clone, Copy)]
pub struct HttpDownloader {
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader whose requests never exceed `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-request upper bound on network time.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Network time allowed for one request under `deadline`.
    fn budget(&self, url: &str, deadline: Option<Deadline>) -> Result<Duration, DownloadError> {
        match deadline {
            None => Ok(self.timeout),
            Some(deadline) => deadline
                .remaining()
                .map(|left| left.min(self.timeout))
                .ok_or_else(|| DownloadError::DeadlineExceeded {
                    url: url.to_owned(),
                }),
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl ArtefactDownloader for HttpDownloader {
    fn download(&self, url: &str, deadline: Option<Deadline>) -> Result<Vec<u8>, DownloadError> {
        let budget = self.budget(url, deadline)?;
        if let Some(path) = url.strip_prefix("file://") {
            return read_local(url, path);
        }
        debug!("GET {url} (timeout {budget:?})");
        download_bytes(url, budget)
    }
}

/// Download a URL and return the body.
fn download_bytes(url: &str, budget: Duration) -> Result<Vec<u8>, DownloadError> {
    let response = http_agent()
        .get(url)
        .config()
        .timeout_global(Some(budget))
        .build()
        .call()
        .map_err(|e| map_ureq_error(url, &e))?;
    let mut body = Vec::new();
    response
        .into_body()
        .as_reader()
        .read_to_end(&mut body)
        .map_err(|e| map_read_error(url, &e))?;
    Ok(body)
}

fn read_local(url: &str, path: &str) -> Result<Vec<u8>, DownloadError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => DownloadError::NotFound {
            url: url.to_owned(),
        },
        _ => DownloadError::Io {
            url: url.to_owned(),
            source,
        },
    })
}

/// Shared `ureq` agent; per-request timeouts are applied on each call.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DEFAULT_DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::Timeout(_) => DownloadError::DeadlineExceeded {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Map a body read failure, which surfaces timeouts as I/O errors.
fn map_read_error(url: &str, err: &std::io::Error) -> DownloadError {
    match err.kind() {
        std::io::ErrorKind::TimedOut => DownloadError::DeadlineExceeded {
            url: url.to_owned(),
        },
        _ => DownloadError::HttpError {
            url: url.to_owned(),
            reason: err.to_string(),
        },
    }
}
