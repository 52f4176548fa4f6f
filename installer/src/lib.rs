//! plugstage installer library.
//!
//! This crate fetches prebuilt plugin binaries and their manifests, verifies
//! them against pinned SHA-256 digests, decompresses the binaries into a
//! deterministic output layout, and registers each result as a named
//! toolchain. It is used by the `plugstage-installer` CLI binary and can be
//! consumed programmatically for testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Artefact descriptors, fetching, and extraction
//! - [`cache`] - Content-addressed download cache
//! - [`cli`] - Command-line argument definitions
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types for the CLI boundary
//! - [`install_flow`] - Install command planning and execution
//! - [`list`] - List command implementation
//! - [`list_output`] - Output formatting for toolchain listing
//! - [`output`] - Progress, summary, and dry-run formatting
//! - [`pipeline`] - Fetch, extract, and register orchestration
//! - [`registry`] - Toolchain registration and lookup
//! - [`telemetry`] - Diagnostic logging setup for the binary

pub mod artefact;
pub mod cache;
pub mod cli;
pub mod dirs;
pub mod error;
pub mod install_flow;
pub mod list;
pub mod list_output;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
