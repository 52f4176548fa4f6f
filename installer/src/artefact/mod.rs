//! Artefact descriptors, fetching, and extraction.
//!
//! # Sub-modules
//!
//! - [`download`]: Downloader trait, deadlines, and the HTTP implementation.
//! - [`error`]: Semantic error types for descriptor validation.
//! - [`extraction`]: Gzip decompression into deterministic destinations.
//! - [`fetch`]: Checksum-verified, cache-aware fetching.
//! - [`local`]: Materialised files (`LocalArtefact`).
//! - [`manifest`]: Plugin manifest schema and parser.
//! - [`remote`]: Remote descriptors (`RemoteArtefact`).
//! - [`sha256_digest`]: SHA-256 digest newtype (`Sha256Digest`).
//! - [`state`]: Per-toolchain state machine (`ArtefactState`).

pub mod download;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod local;
pub mod manifest;
pub mod remote;
pub mod sha256_digest;
pub mod state;
