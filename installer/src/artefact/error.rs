//! Error types for artefact descriptors.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid artefact-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A URL uses a scheme the fetcher cannot retrieve.
    #[error("unsupported artefact URL \"{url}\"; expected http://, https://, or file://")]
    UnsupportedUrl {
        /// The rejected URL.
        url: String,
    },

    /// An artefact or toolchain name cannot be used as a path component.
    #[error("invalid artefact name \"{value}\": {reason}")]
    InvalidName {
        /// The rejected name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
