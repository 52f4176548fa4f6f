//! Shared test utilities for the installer crate.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::artefact::download::{ArtefactDownloader, Deadline, DownloadError};
use crate::artefact::sha256_digest::Sha256Digest;

/// Compress `bytes` into a single gzip stream.
///
/// # Panics
///
/// Panics if the in-memory encoder fails, which does not happen in practice.
#[must_use]
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256Digest::of(bytes).into_inner()
}

/// A minimal plugin manifest naming `entry_point`.
#[must_use]
pub fn plugin_manifest_json(name: &str, entry_point: &str) -> String {
    format!(
        concat!(
            r#"{{"manifestVersion":1,"pluginInterfaceVersion":1,"#,
            r#""name":"{name}","version":"0.1.0","executableType":"exec","#,
            r#""entryPoint":"{entry_point}","pluginConfig":{{"mode":"test"}}}}"#,
        ),
        name = name,
        entry_point = entry_point,
    )
}

/// A stub implementation of `ArtefactDownloader` for testing.
///
/// Serves canned bodies keyed by URL, answers unknown URLs with
/// [`DownloadError::NotFound`], and counts requests per URL. It is `Sync`,
/// so it can back the parallel pipeline.
#[derive(Debug, Default)]
pub struct StubDownloader {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl StubDownloader {
    /// Creates an empty `StubDownloader`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn serving(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_owned(), body);
        self
    }

    /// How many times `url` was requested.
    ///
    /// # Panics
    ///
    /// Panics if a previous request panicked while holding the counter.
    #[must_use]
    pub fn requests(&self, url: &str) -> usize {
        let requests = self.requests.lock().expect("request counter");
        requests.get(url).copied().unwrap_or_default()
    }
}

impl ArtefactDownloader for StubDownloader {
    fn download(&self, url: &str, deadline: Option<Deadline>) -> Result<Vec<u8>, DownloadError> {
        *self
            .requests
            .lock()
            .expect("request counter")
            .entry(url.to_owned())
            .or_default() += 1;

        if deadline.is_some_and(|d| d.remaining().is_none()) {
            return Err(DownloadError::DeadlineExceeded {
                url: url.to_owned(),
            });
        }

        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_owned(),
            })
    }
}
