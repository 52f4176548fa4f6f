//! Output formatting for the installer CLI.
//!
//! Progress and summaries go to stderr; machine-readable listings go to
//! stdout (see [`crate::list_output`]).

use std::io::Write;
use std::time::Duration;

use camino::Utf8Path;

use crate::pipeline::ToolchainRequest;
use crate::registry::ToolchainRegistry;

/// Write one line to `stderr`, ignoring failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format a success message after installation.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use plugstage_installer::output::success_message;
///
/// let msg = success_message(2, Utf8Path::new("/opt/toolchains"));
/// assert_eq!(msg, "Successfully registered 2 toolchains in /opt/toolchains");
/// ```
#[must_use]
pub fn success_message(count: usize, output_dir: &Utf8Path) -> String {
    let plural = if count == 1 { "toolchain" } else { "toolchains" };
    format!("Successfully registered {count} {plural} in {output_dir}")
}

/// One line per registered toolchain: name, binary path, entry point.
#[must_use]
pub fn registry_summary(registry: &ToolchainRegistry) -> Vec<String> {
    registry
        .iter()
        .map(|handle| {
            format!(
                "  {} -> {} (entry point {})",
                handle.name(),
                handle.artefact().path(),
                handle.entry_point()
            )
        })
        .collect()
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Configuration file that was read.
    pub config_path: &'a Utf8Path,
    /// Extraction root.
    pub output_dir: &'a Utf8Path,
    /// Download cache, `None` when disabled.
    pub cache_dir: Option<&'a Utf8Path>,
    /// Download time budget.
    pub timeout: Duration,
    /// Verbosity level (0 = normal, 1+ = verbose).
    pub verbosity: u8,
    /// Whether quiet mode is enabled.
    pub quiet: bool,
    /// Toolchains that would be installed.
    pub requests: &'a [ToolchainRequest],
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Configuration: {}", self.config_path),
            format!("Output directory: {}", self.output_dir),
            format!(
                "Cache directory: {}",
                self.cache_dir
                    .map_or_else(|| "(disabled)".to_owned(), ToString::to_string)
            ),
            format!("Timeout: {}s", self.timeout.as_secs()),
            format!("Verbosity level: {}", self.verbosity),
            format!("Quiet: {}", self.quiet),
            String::new(),
            "Toolchains to install:".to_owned(),
        ];

        if self.requests.is_empty() {
            lines.push("  (none configured)".to_owned());
        }
        for request in self.requests {
            lines.push(format!("  - {}", request.name()));
            lines.push(format!("      binary:   {}", request.binary().remote()));
            lines.push(format!("      manifest: {}", request.manifest().remote()));
        }

        lines.join("\n")
    }
}
