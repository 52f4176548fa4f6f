//! List command implementation.
//!
//! This module provides the `run_list` command handler, which reports each
//! configured toolchain and whether it is present in the output directory.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use log::trace;
use plugstage::{DEFAULT_CONFIG_FILE, PlugstageConfig, ResolvedToolchain};

use crate::artefact::manifest::parse_manifest;
use crate::cli::ListArgs;
use crate::dirs::{BaseDirs, resolve_output_dir};
use crate::error::{InstallerError, Result};
use crate::list_output::{ToolchainStatus, format_human, format_json};

/// Lists configured toolchains and their install state.
///
/// Output is written to stdout (human-readable by default, JSON with `--json`).
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded or resolved
/// - No output directory can be determined
/// - Writing to stdout fails
pub fn run_list(args: &ListArgs, dirs: &dyn BaseDirs, stdout: &mut dyn Write) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG_FILE));
    let toolchains = PlugstageConfig::load(&config_path)?.resolve()?;
    let output_dir = resolve_output_dir(args.output_dir.as_deref(), dirs)?;

    let statuses: Vec<_> = toolchains
        .iter()
        .map(|toolchain| toolchain_status(toolchain, &output_dir))
        .collect();

    let output = if args.json {
        format_json(&statuses)
    } else {
        format_human(&statuses)
    };

    writeln!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })?;

    Ok(())
}

/// Inspect `<output_dir>/<name>/` for the toolchain's files.
#[must_use]
pub fn toolchain_status(toolchain: &ResolvedToolchain, output_dir: &Utf8Path) -> ToolchainStatus {
    let dir = output_dir.join(&toolchain.name);
    let binary = dir.join(&toolchain.binary.file_name);
    let manifest = dir.join(&toolchain.manifest.file_name);
    let installed = binary.is_file() && manifest.is_file();

    let entry_point = if installed {
        read_entry_point(&manifest)
    } else {
        None
    };

    ToolchainStatus {
        name: toolchain.name.clone(),
        version: toolchain.version.clone(),
        binary,
        installed,
        entry_point,
    }
}

fn read_entry_point(manifest: &Utf8Path) -> Option<String> {
    let json = match std::fs::read_to_string(manifest) {
        Ok(json) => json,
        Err(e) => {
            trace!("read_entry_point: failed to read {manifest}: {e}");
            return None;
        }
    };
    match parse_manifest(&json) {
        Ok(parsed) => Some(parsed.entry_point().to_owned()),
        Err(e) => {
            trace!("read_entry_point: {manifest} does not parse: {e}");
            None
        }
    }
}
