//! Error types for the plugstage installer CLI.
//!
//! This module defines semantic error variants that tell the user which
//! toolchain, stage, or directory caused the run to fail.

use plugstage::ConfigError;
use thiserror::Error;

use crate::artefact::error::ArtefactError;
use crate::pipeline::PipelineError;

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The configuration file could not be loaded or resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A configured toolchain does not describe a valid artefact.
    #[error("toolchain {toolchain}: {source}")]
    InvalidArtefact {
        /// The offending toolchain.
        toolchain: String,
        /// What is wrong with it.
        #[source]
        source: ArtefactError,
    },

    /// One or more toolchains failed to materialise.
    #[error("{}", describe_failures(.failures))]
    Materialise {
        /// Every failure, in configuration order.
        failures: Vec<PipelineError>,
    },

    /// A default directory could not be determined.
    #[error("could not determine {purpose} directory: {reason}; pass it explicitly")]
    DirectoryUnavailable {
        /// Which directory was needed, such as "cache".
        purpose: &'static str,
        /// Why it is unavailable.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

fn describe_failures(failures: &[PipelineError]) -> String {
    let mut message = match failures {
        [single] => return single.to_string(),
        _ => format!("{} toolchains failed:", failures.len()),
    };
    for failure in failures {
        message.push_str(&format!("\n  - [{}] {failure}", failure.stage()));
    }
    message
}

impl InstallerError {
    /// Whether rerunning the installer could succeed without changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Materialise { failures } => failures.iter().all(PipelineError::is_transient),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::download::DownloadError;
    use crate::artefact::fetch::FetchError;
    use crate::registry::ValidationError;

    fn network_failure(toolchain: &str) -> PipelineError {
        PipelineError::Fetch {
            toolchain: toolchain.to_owned(),
            artefact: format!("https://example.test/{toolchain}.gz"),
            source: FetchError::Network(DownloadError::NotFound {
                url: format!("https://example.test/{toolchain}.gz"),
            }),
        }
    }

    #[test]
    fn single_failure_is_reported_verbatim() {
        let err = InstallerError::Materialise {
            failures: vec![network_failure("protobuf")],
        };
        let msg = err.to_string();
        assert!(msg.contains("toolchain protobuf"));
        assert!(msg.contains("not found"));
        assert!(err.is_transient());
    }

    #[test]
    fn multiple_failures_are_listed_with_their_stage() {
        let err = InstallerError::Materialise {
            failures: vec![
                network_failure("protobuf"),
                PipelineError::Register {
                    toolchain: "csv".to_owned(),
                    source: ValidationError::DuplicateToolchain {
                        name: "csv".to_owned(),
                    },
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 toolchains failed:"));
        assert!(msg.contains("[fetch] toolchain protobuf"));
        assert!(msg.contains("[register] toolchain csv"));
        assert!(!err.is_transient());
    }

    #[test]
    fn directory_unavailable_suggests_flag() {
        let err = InstallerError::DirectoryUnavailable {
            purpose: "cache",
            reason: "no home directory".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache directory"));
        assert!(msg.contains("pass it explicitly"));
    }

    #[test]
    fn write_failed_preserves_source() {
        let err = InstallerError::WriteFailed {
            source: std::io::Error::other("broken pipe"),
        };
        assert!(err.to_string().contains("write"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
