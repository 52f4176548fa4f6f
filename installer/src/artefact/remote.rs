//! Remote artefact descriptors.
//!
//! A [`RemoteArtefact`] pairs a download URL with the digest its content must
//! hash to. Descriptors are validated at construction and immutable after.

use std::fmt;

use super::error::{ArtefactError, Result};
use super::sha256_digest::Sha256Digest;

/// Hash algorithm used to check downloaded content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// SHA-256, hex encoded.
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    /// Number of hex characters a checksum of this algorithm carries.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// A downloadable artefact and the checksum its bytes must match.
///
/// # Examples
///
/// ```
/// use plugstage_installer::artefact::remote::RemoteArtefact;
///
/// let artefact = RemoteArtefact::new(
///     "https://example.test/plugin.gz",
///     &"a".repeat(64),
/// )
/// .expect("valid descriptor");
/// assert_eq!(artefact.url(), "https://example.test/plugin.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtefact {
    url: String,
    expected: Sha256Digest,
    algorithm: ChecksumAlgorithm,
}

impl RemoteArtefact {
    /// Build a SHA-256 descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::UnsupportedUrl`] if the URL scheme is not
    /// `http`, `https`, or `file`, and
    /// [`ArtefactError::InvalidSha256Digest`] if the checksum is malformed.
    pub fn new(url: &str, expected_checksum: &str) -> Result<Self> {
        validate_url(url)?;
        let expected = Sha256Digest::try_from(expected_checksum.trim())?;
        Ok(Self {
            url: url.to_owned(),
            expected,
            algorithm: ChecksumAlgorithm::Sha256,
        })
    }

    /// The download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The checksum the downloaded bytes must match.
    #[must_use]
    pub fn expected_checksum(&self) -> &Sha256Digest {
        &self.expected
    }

    /// The checksum algorithm.
    #[must_use]
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }
}

impl fmt::Display for RemoteArtefact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.url, self.algorithm, self.expected)
    }
}

fn validate_url(url: &str) -> Result<()> {
    let supported = ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme));
    if supported {
        Ok(())
    } else {
        Err(ArtefactError::UnsupportedUrl {
            url: url.to_owned(),
        })
    }
}

/// Validate that `value` can be used as a single path component.
///
/// Toolchain and file names become directory and file names under the
/// output directory, so separators and relative components are refused.
///
/// # Errors
///
/// Returns [`ArtefactError::InvalidName`] describing the problem.
pub fn validate_name(value: &str) -> Result<()> {
    let reason = if value.trim().is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else if value.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ArtefactError::InvalidName {
            value: value.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}
