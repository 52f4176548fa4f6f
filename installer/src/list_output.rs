//! Output formatting for toolchain listing.
//!
//! This module formats the configured toolchains and their install state
//! for human-readable or JSON output.

use camino::Utf8PathBuf;
use serde::Serialize;

/// Install state of one configured toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainStatus {
    /// Logical toolchain name.
    pub name: String,
    /// Configured plugin version.
    pub version: String,
    /// Where the binary is, or would be, extracted.
    pub binary: Utf8PathBuf,
    /// Whether both the binary and the manifest are present.
    pub installed: bool,
    /// Entry point from the installed manifest, when it parses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
}

/// Format toolchain statuses for human-readable output.
///
/// # Examples
///
/// ```
/// use plugstage_installer::list_output::format_human;
///
/// let output = format_human(&[]);
/// assert!(output.contains("No toolchains configured"));
/// ```
#[must_use]
pub fn format_human(statuses: &[ToolchainStatus]) -> String {
    if statuses.is_empty() {
        return String::from(
            "No toolchains configured.\n\nAdd a [[toolchain]] entry to plugstage.toml.",
        );
    }

    let mut output = String::from("Configured toolchains:\n");
    for status in statuses {
        let state = if status.installed {
            "installed"
        } else {
            "not installed"
        };
        output.push_str(&format!(
            "\n  {} {} ({state})\n    binary: {}\n",
            status.name, status.version, status.binary
        ));
        if let Some(entry_point) = &status.entry_point {
            output.push_str(&format!("    entry point: {entry_point}\n"));
        }
    }

    output
}

/// Format toolchain statuses as JSON.
///
/// # Examples
///
/// ```
/// use plugstage_installer::list_output::format_json;
///
/// let json = format_json(&[]);
/// assert!(json.contains("\"toolchains\""));
/// ```
#[must_use]
pub fn format_json(statuses: &[ToolchainStatus]) -> String {
    #[derive(Serialize)]
    struct Listing<'a> {
        toolchains: &'a [ToolchainStatus],
    }

    serde_json::to_string_pretty(&Listing {
        toolchains: statuses,
    })
    .unwrap_or_else(|_| "{}".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(installed: bool) -> ToolchainStatus {
        ToolchainStatus {
            name: "protobuf".to_owned(),
            version: "0.3.0".to_owned(),
            binary: Utf8PathBuf::from("/opt/toolchains/protobuf/pact-protobuf-plugin"),
            installed,
            entry_point: installed.then(|| "pact-protobuf-plugin".to_owned()),
        }
    }

    #[test]
    fn format_human_empty_suggests_configuration() {
        let output = format_human(&[]);
        assert!(output.contains("No toolchains configured"));
        assert!(output.contains("plugstage.toml"));
    }

    #[test]
    fn format_human_shows_state_and_entry_point() {
        let output = format_human(&[sample(true)]);

        assert!(output.contains("protobuf 0.3.0 (installed)"));
        assert!(output.contains("entry point: pact-protobuf-plugin"));
    }

    #[test]
    fn format_human_marks_missing_toolchains() {
        let output = format_human(&[sample(false)]);

        assert!(output.contains("(not installed)"));
        assert!(!output.contains("entry point"));
    }

    #[test]
    fn format_json_includes_all_fields() {
        let json = format_json(&[sample(true)]);
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

        let entry = &value["toolchains"][0];
        assert_eq!(entry["name"], "protobuf");
        assert_eq!(entry["version"], "0.3.0");
        assert_eq!(entry["installed"], true);
        assert_eq!(entry["entry_point"], "pact-protobuf-plugin");
        assert_eq!(
            entry["binary"],
            "/opt/toolchains/protobuf/pact-protobuf-plugin"
        );
    }

    #[test]
    fn format_json_omits_unknown_entry_point() {
        let json = format_json(&[sample(false)]);
        assert!(!json.contains("entry_point"));
    }
}
