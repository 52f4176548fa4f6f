//! CLI argument definitions for the plugstage installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Largest accepted `--timeout-secs` value: one week.
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Fetch, verify, and register prebuilt plugin toolchains.
#[derive(Parser, Debug)]
#[command(name = "plugstage-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Fetch, verify, and register prebuilt plugin toolchains.\n\n",
    "Each [[toolchain]] in plugstage.toml names a gzip-compressed plugin binary ",
    "and its JSON manifest, both pinned by SHA-256. The installer downloads ",
    "them, checks their digests, decompresses the binary into ",
    "<output-dir>/<name>/, and reports the registered toolchains.\n\n",
    "Independent toolchains are fetched in parallel. Downloads are cached by ",
    "digest, so rerunning the installer does not touch the network.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install every toolchain in ./plugstage.toml:\n",
    "    $ plugstage-installer\n\n",
    "  Use another configuration and output directory:\n",
    "    $ plugstage-installer install -c ci/plugstage.toml -o build/toolchains\n\n",
    "  Give up on downloads after two minutes:\n",
    "    $ plugstage-installer --timeout-secs 120\n\n",
    "  Show what is configured and installed:\n",
    "    $ plugstage-installer list\n\n",
    "  Preview without downloading:\n",
    "    $ plugstage-installer --dry-run",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Install arguments (used when no subcommand is given).
    #[command(flatten)]
    pub install: InstallArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Install configured toolchains (default when no subcommand given).
    Install(InstallArgs),

    /// List configured toolchains and whether they are installed.
    List(ListArgs),
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Toolchain configuration file [default: ./plugstage.toml].
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Download cache directory [default: platform-specific].
    #[arg(long, value_name = "DIR", conflicts_with = "no_cache")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Always download, bypassing the cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Directory toolchains are extracted into [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Abandon downloads still running after this many seconds.
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    pub timeout_secs: Option<u64>,

    /// Show configuration and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        alias = "verbosity",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Arguments for the list command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ListArgs {
    /// Toolchain configuration file [default: ./plugstage.toml].
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory to check for installed toolchains [default: platform-specific].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Returns the effective install arguments.
    ///
    /// If an `Install` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened install arguments.
    ///
    /// # Note
    ///
    /// When `Command::List` is active, this returns the default flattened
    /// install arguments. Callers should check `self.command` before calling
    /// this method if the `List` case needs different handling.
    #[must_use]
    pub fn install_args(&self) -> &InstallArgs {
        match &self.command {
            Some(Command::Install(args)) => args,
            Some(Command::List(_)) | None => &self.install,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
