//! Install command implementation.
//!
//! Turns CLI arguments into an [`InstallPlan`] (configuration, directories,
//! time budget), then runs the pipeline and reports the outcome. Kept apart
//! from `main.rs` so the whole flow can be driven with a stub downloader.

use std::io::Write;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use plugstage::{DEFAULT_CONFIG_FILE, PlugstageConfig};

use crate::artefact::download::{ArtefactDownloader, DEFAULT_DOWNLOAD_TIMEOUT, Deadline};
use crate::artefact::extraction::FileExtractor;
use crate::cache::ContentCache;
use crate::cli::InstallArgs;
use crate::dirs::{BaseDirs, resolve_cache_dir, resolve_output_dir};
use crate::error::{InstallerError, Result};
use crate::output::{DryRunInfo, registry_summary, success_message, write_stderr_line};
use crate::pipeline::{PipelineContext, ToolchainRequest, materialise_all};
use crate::registry::ToolchainRegistry;

/// Everything the install command decided before touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// Configuration file that was read.
    pub config_path: Utf8PathBuf,
    /// Extraction root.
    pub output_dir: Utf8PathBuf,
    /// Download cache, `None` with `--no-cache`.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Overall download time budget.
    pub timeout: Duration,
    /// Toolchains to materialise, in configuration order.
    pub requests: Vec<ToolchainRequest>,
}

/// Download time budget requested by `args`.
#[must_use]
pub fn install_timeout(args: &InstallArgs) -> Duration {
    args.timeout_secs
        .map_or(DEFAULT_DOWNLOAD_TIMEOUT, Duration::from_secs)
}

/// Load the configuration and resolve every directory.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a toolchain
/// describes an invalid artefact, or a directory cannot be determined.
pub fn plan_install(args: &InstallArgs, dirs: &dyn BaseDirs) -> Result<InstallPlan> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG_FILE));
    let toolchains = PlugstageConfig::load(&config_path)?.resolve()?;

    let requests = toolchains
        .iter()
        .map(|toolchain| {
            ToolchainRequest::try_from(toolchain).map_err(|source| {
                InstallerError::InvalidArtefact {
                    toolchain: toolchain.name.clone(),
                    source,
                }
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cache_dir = if args.no_cache {
        None
    } else {
        Some(resolve_cache_dir(args.cache_dir.as_deref(), dirs)?)
    };

    Ok(InstallPlan {
        config_path,
        output_dir: resolve_output_dir(args.output_dir.as_deref(), dirs)?,
        cache_dir,
        timeout: install_timeout(args),
        requests,
    })
}

/// Materialise every toolchain in `plan`.
///
/// The deadline starts when this function is called; downloads still
/// running when it passes fail with a network error. A timeout too large to
/// represent as an instant runs without a deadline.
///
/// # Errors
///
/// Returns [`InstallerError::Materialise`] listing every failed toolchain.
pub fn execute_plan(
    plan: &InstallPlan,
    downloader: &(dyn ArtefactDownloader + Sync),
) -> Result<ToolchainRegistry> {
    let cache = plan.cache_dir.clone().map(ContentCache::new);
    let context = PipelineContext {
        downloader,
        extractor: &FileExtractor,
        cache: cache.as_ref(),
        output_dir: &plan.output_dir,
        deadline: Deadline::after(plan.timeout),
    };

    materialise_all(&plan.requests, &context)
        .map_err(|failures| InstallerError::Materialise { failures })
}

/// Run the install command.
///
/// With `--dry-run` the plan is printed and nothing is downloaded. Returns
/// the registry when toolchains were materialised.
///
/// # Errors
///
/// Returns an error if planning fails or any toolchain fails.
pub fn run_install(
    args: &InstallArgs,
    dirs: &dyn BaseDirs,
    downloader: &(dyn ArtefactDownloader + Sync),
    stderr: &mut dyn Write,
) -> Result<Option<ToolchainRegistry>> {
    let plan = plan_install(args, dirs)?;

    if args.dry_run {
        let info = DryRunInfo {
            config_path: &plan.config_path,
            output_dir: &plan.output_dir,
            cache_dir: plan.cache_dir.as_deref(),
            timeout: plan.timeout,
            verbosity: args.verbosity,
            quiet: args.quiet,
            requests: &plan.requests,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(None);
    }

    if !args.quiet {
        write_stderr_line(
            stderr,
            format!(
                "Installing {} toolchain(s) from {}...",
                plan.requests.len(),
                plan.config_path
            ),
        );
    }

    let started = Instant::now();
    let registry = execute_plan(&plan, downloader)?;

    if !args.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, success_message(registry.len(), &plan.output_dir));
        for line in registry_summary(&registry) {
            write_stderr_line(stderr, line);
        }
        write_stderr_line(
            stderr,
            format!("Finished in {:.3}s", started.elapsed().as_secs_f64()),
        );
    }

    Ok(Some(registry))
}

#[cfg(test)]
#[path = "install_flow_tests.rs"]
mod tests;
