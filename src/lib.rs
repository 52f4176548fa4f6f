//! Shared configuration for plugstage plugin toolchains.
//!
//! The installer crate consumes the resolved entries produced here; this
//! crate only knows how to read `plugstage.toml` and expand its templates.

pub mod config;

pub use config::{
    ArtefactSource, ConfigError, DEFAULT_CONFIG_FILE, PlugstageConfig, ResolvedSource,
    ResolvedToolchain, ToolchainConfig,
};
