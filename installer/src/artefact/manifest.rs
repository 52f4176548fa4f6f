//! Plugin manifest schema.
//!
//! Every plugin binary ships with a JSON sidecar describing how the host
//! should launch it. Only the fields the installer needs are typed; the
//! free-form `pluginConfig` object is kept as raw JSON for downstream
//! consumers.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Errors arising from manifest parsing.
#[derive(Debug, thiserror::Error)]
pub enum ManifestParseError {
    /// JSON deserialization failed.
    #[error("manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was present but blank.
    #[error("manifest field `{field}` must not be empty")]
    EmptyField {
        /// The JSON name of the offending field.
        field: &'static str,
    },
}

/// Parsed plugin manifest.
///
/// Unknown fields are accepted so newer manifests still load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    #[serde(default)]
    manifest_version: Option<u32>,
    #[serde(default)]
    plugin_interface_version: Option<u32>,
    name: String,
    version: String,
    #[serde(default)]
    executable_type: Option<String>,
    entry_point: String,
    #[serde(default)]
    plugin_config: Map<String, Value>,
}

impl PluginManifest {
    /// The plugin's self-declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin's self-declared version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// File name of the executable the host launches.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// How the entry point is run, e.g. `exec`.
    #[must_use]
    pub fn executable_type(&self) -> Option<&str> {
        self.executable_type.as_deref()
    }

    /// Version of the manifest format itself.
    #[must_use]
    pub fn manifest_version(&self) -> Option<u32> {
        self.manifest_version
    }

    /// Version of the host/plugin protocol the plugin speaks.
    #[must_use]
    pub fn plugin_interface_version(&self) -> Option<u32> {
        self.plugin_interface_version
    }

    /// Plugin-specific configuration, empty when absent.
    #[must_use]
    pub fn plugin_config(&self) -> &Map<String, Value> {
        &self.plugin_config
    }
}

/// Parse a JSON string into a [`PluginManifest`].
///
/// # Errors
///
/// Returns an error if the JSON is malformed, a required field is missing,
/// or `name`, `version` or `entryPoint` is blank.
///
/// # Examples
///
/// ```
/// use plugstage_installer::artefact::manifest::parse_manifest;
///
/// let json = r#"{"name":"protobuf","version":"0.3.0","entryPoint":"pact-protobuf-plugin"}"#;
/// let manifest = parse_manifest(json).expect("valid manifest");
/// assert_eq!(manifest.entry_point(), "pact-protobuf-plugin");
/// assert!(manifest.plugin_config().is_empty());
/// ```
pub fn parse_manifest(json: &str) -> Result<PluginManifest, ManifestParseError> {
    let manifest: PluginManifest = serde_json::from_str(json)?;
    for (field, value) in [
        ("name", &manifest.name),
        ("version", &manifest.version),
        ("entryPoint", &manifest.entry_point),
    ] {
        if value.trim().is_empty() {
            return Err(ManifestParseError::EmptyField { field });
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FULL: &str = r#"{
        "manifestVersion": 1,
        "pluginInterfaceVersion": 1,
        "name": "protobuf",
        "version": "0.3.0",
        "executableType": "exec",
        "entryPoint": "pact-protobuf-plugin",
        "pluginConfig": {"protocVersion": "3.19.1", "downloadUrl": "https://example.test"},
        "dependencies": []
    }"#;

    #[test]
    fn parses_full_manifest() {
        let manifest = parse_manifest(FULL).expect("valid");

        assert_eq!(manifest.name(), "protobuf");
        assert_eq!(manifest.version(), "0.3.0");
        assert_eq!(manifest.entry_point(), "pact-protobuf-plugin");
        assert_eq!(manifest.executable_type(), Some("exec"));
        assert_eq!(manifest.manifest_version(), Some(1));
        assert_eq!(manifest.plugin_interface_version(), Some(1));
        assert_eq!(
            manifest.plugin_config().get("protocVersion"),
            Some(&Value::from("3.19.1"))
        );
    }

    #[test]
    fn optional_fields_default() {
        let manifest =
            parse_manifest(r#"{"name":"csv","version":"1.0.0","entryPoint":"csv-plugin"}"#)
                .expect("valid");

        assert_eq!(manifest.executable_type(), None);
        assert_eq!(manifest.plugin_interface_version(), None);
        assert!(manifest.plugin_config().is_empty());
    }

    #[rstest]
    #[case::syntax("{not valid json")]
    #[case::missing_entry_point(r#"{"name":"csv","version":"1.0.0"}"#)]
    #[case::wrong_type(r#"{"name":"csv","version":1,"entryPoint":"csv-plugin"}"#)]
    fn rejects_malformed_manifest(#[case] json: &str) {
        assert!(matches!(
            parse_manifest(json),
            Err(ManifestParseError::Json(_))
        ));
    }

    #[rstest]
    #[case::name(r#"{"name":" ","version":"1.0.0","entryPoint":"csv-plugin"}"#, "name")]
    #[case::entry_point(r#"{"name":"csv","version":"1.0.0","entryPoint":""}"#, "entryPoint")]
    fn rejects_blank_required_fields(#[case] json: &str, #[case] expected: &str) {
        let err = parse_manifest(json).expect_err("blank field");
        assert!(matches!(err, ManifestParseError::EmptyField { field } if field == expected));
    }
}
