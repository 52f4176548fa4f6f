//! Parameterised toolchain configuration loaded from `plugstage.toml`.
//!
//! Each `[[toolchain]]` table describes one plugin toolchain by version,
//! source repository, and the two artefacts it needs: the gzip-compressed
//! plugin binary and its manifest. URLs are templates so that bumping a
//! version is a one-field change rather than a copy of the whole entry.
//!
//! ```toml
//! [[toolchain]]
//! name = "protobuf"
//! version = "0.3.0"
//! repository = "https://github.com/pactflow/pact-protobuf-plugin"
//!
//! [toolchain.binary]
//! url = "{repository}/releases/download/v-{version}/pact-protobuf-plugin-linux-x86_64.gz"
//! sha256 = "..."
//!
//! [toolchain.manifest]
//! url = "{repository}/releases/download/v-{version}/pact-plugin.json"
//! sha256 = "..."
//! ```

use std::collections::HashSet;

use camino::Utf8Path;
use serde::Deserialize;
use thiserror::Error;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "plugstage.toml";

/// Manifest file name used when the manifest URL has no usable final segment.
const DEFAULT_MANIFEST_FILE: &str = "manifest.json";

/// Errors raised while loading or resolving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document is malformed or has unknown fields.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two toolchains share a logical name.
    #[error("toolchain {name} is declared more than once")]
    DuplicateToolchain {
        /// The repeated name.
        name: String,
    },

    /// A field of a toolchain entry is empty or malformed.
    #[error("toolchain {toolchain}: {reason}")]
    Invalid {
        /// Name of the offending toolchain entry.
        toolchain: String,
        /// Description of the problem.
        reason: String,
    },
}

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level contents of `plugstage.toml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PlugstageConfig {
    /// Declared toolchains, in file order.
    #[serde(rename = "toolchain")]
    pub toolchains: Vec<ToolchainConfig>,
}

/// One `[[toolchain]]` entry before template expansion.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Logical name later build steps use to refer to the toolchain.
    pub name: String,
    /// Plugin version, available to URL templates as `{version}`.
    pub version: String,
    /// Source repository, available to URL templates as `{repository}`.
    #[serde(default)]
    pub repository: Option<String>,
    /// The gzip-compressed plugin binary.
    pub binary: ArtefactSource,
    /// The plugin manifest accompanying the binary.
    pub manifest: ArtefactSource,
}

/// Where an artefact lives and what it must hash to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArtefactSource {
    /// URL template for the artefact.
    pub url: String,
    /// Expected SHA-256 of the downloaded bytes, lowercase hex.
    pub sha256: String,
    /// File name of the materialised artefact.
    #[serde(default)]
    pub file_name: Option<String>,
}

/// A toolchain entry with every template expanded and every default filled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedToolchain {
    /// Logical toolchain name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Resolved binary source.
    pub binary: ResolvedSource,
    /// Resolved manifest source.
    pub manifest: ResolvedSource,
}

/// A fully rendered artefact source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedSource {
    /// Concrete download URL.
    pub url: String,
    /// Expected SHA-256, lowercase hex.
    pub sha256: String,
    /// File name of the materialised artefact.
    pub file_name: String,
}

impl PlugstageConfig {
    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid configuration document.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugstage::PlugstageConfig;
    ///
    /// let config = PlugstageConfig::from_toml_str("").expect("empty config");
    /// assert!(config.toolchains.is_empty());
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Expand templates and defaults for every declared toolchain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateToolchain`] when a name repeats and
    /// [`ConfigError::Invalid`] when an entry has empty fields, an unknown
    /// placeholder, or an unusable file name.
    pub fn resolve(&self) -> Result<Vec<ResolvedToolchain>> {
        let mut seen = HashSet::new();
        self.toolchains
            .iter()
            .map(|toolchain| {
                if !seen.insert(toolchain.name.as_str()) {
                    return Err(ConfigError::DuplicateToolchain {
                        name: toolchain.name.clone(),
                    });
                }
                toolchain.resolve()
            })
            .collect()
    }
}

impl ToolchainConfig {
    /// Expand this entry's templates and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn resolve(&self) -> Result<ResolvedToolchain> {
        self.require_non_empty("name", &self.name)?;
        self.require_non_empty("version", &self.version)?;

        let vars = [
            ("name", self.name.as_str()),
            ("version", self.version.as_str()),
            ("repository", self.repository.as_deref().unwrap_or_default()),
        ];

        let binary = self.resolve_source("binary", &self.binary, &vars, || self.name.clone())?;
        let manifest = self.resolve_source("manifest", &self.manifest, &vars, || {
            DEFAULT_MANIFEST_FILE.to_owned()
        })?;

        Ok(ResolvedToolchain {
            name: self.name.clone(),
            version: self.version.clone(),
            binary,
            manifest,
        })
    }

    fn resolve_source(
        &self,
        role: &str,
        source: &ArtefactSource,
        vars: &[(&str, &str)],
        fallback_name: impl FnOnce() -> String,
    ) -> Result<ResolvedSource> {
        self.require_non_empty(&format!("{role}.url"), &source.url)?;
        self.require_non_empty(&format!("{role}.sha256"), &source.sha256)?;

        if self.repository.is_none() && source.url.contains("{repository}") {
            return Err(self.invalid(format!(
                "{role}.url uses {{repository}} but no repository is set"
            )));
        }
        let url = render_template(&source.url, vars)
            .map_err(|reason| self.invalid(format!("{role}.url: {reason}")))?;

        let file_name = match &source.file_name {
            Some(name) => name.clone(),
            None if role == "manifest" => url_file_name(&url).unwrap_or_else(fallback_name),
            None => fallback_name(),
        };
        validate_file_name(&file_name)
            .map_err(|reason| self.invalid(format!("{role}.file_name: {reason}")))?;

        Ok(ResolvedSource {
            url,
            sha256: source.sha256.trim().to_owned(),
            file_name,
        })
    }

    fn require_non_empty(&self, field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(self.invalid(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Invalid {
            toolchain: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Expand `{placeholder}` occurrences in `template` from `vars`.
///
/// Returns a description of the failure for unknown placeholders or an
/// unterminated brace.
fn render_template(
    template: &str,
    vars: &[(&str, &str)],
) -> std::result::Result<String, String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (literal, tail) = rest.split_at(open);
        rendered.push_str(literal);
        let Some(close) = tail.find('}') else {
            return Err(format!("unterminated placeholder in \"{template}\""));
        };
        let key = tail.get(1..close).unwrap_or_default();
        let value = vars
            .iter()
            .find_map(|(name, value)| (*name == key).then_some(*value))
            .ok_or_else(|| format!("unknown placeholder {{{key}}}"))?;
        rendered.push_str(value);
        rest = tail.get(close + 1..).unwrap_or_default();
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// The final path segment of `url`, ignoring any query or fragment.
fn url_file_name(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_owned)
}

fn validate_file_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".to_owned());
    }
    if name == "." || name == ".." {
        return Err(format!("\"{name}\" is not a file name"));
    }
    if name.contains(['/', '\\']) {
        return Err(format!("\"{name}\" must not contain path separators"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DIGEST: &str = "6b2ee3c8e3b1f2c0e8b3b38f7a3e8d2b9c4d5e6f708192a3b4c5d6e7f8091a2b";

    fn sample_toml() -> String {
        format!(
            concat!(
                "[[toolchain]]\n",
                "name = \"protobuf\"\n",
                "version = \"0.3.0\"\n",
                "repository = \"https://github.com/pactflow/pact-protobuf-plugin\"\n",
                "[toolchain.binary]\n",
                "url = \"{{repository}}/releases/download/v-{{version}}/{{name}}-linux-x86_64.gz\"\n",
                "sha256 = \"{digest}\"\n",
                "[toolchain.manifest]\n",
                "url = \"{{repository}}/releases/download/v-{{version}}/pact-plugin.json\"\n",
                "sha256 = \"{digest}\"\n",
            ),
            digest = DIGEST
        )
    }

    #[test]
    fn resolves_templates_and_defaults() {
        let config = PlugstageConfig::from_toml_str(&sample_toml()).expect("parse");
        let resolved = config.resolve().expect("resolve");
        let [toolchain] = resolved.as_slice() else {
            panic!("expected one toolchain, got {resolved:?}");
        };

        assert_eq!(toolchain.name, "protobuf");
        assert_eq!(
            toolchain.binary.url,
            "https://github.com/pactflow/pact-protobuf-plugin/releases/download/v-0.3.0/protobuf-linux-x86_64.gz"
        );
        assert_eq!(toolchain.binary.file_name, "protobuf");
        assert_eq!(toolchain.manifest.file_name, "pact-plugin.json");
        assert_eq!(toolchain.manifest.sha256, DIGEST);
    }

    #[test]
    fn empty_document_has_no_toolchains() {
        let config = PlugstageConfig::from_toml_str("").expect("parse");
        assert!(config.resolve().expect("resolve").is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let toml = format!("{}colour = \"blue\"\n", sample_toml());
        let err = PlugstageConfig::from_toml_str(&toml).expect_err("unknown field");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let toml = format!("{0}{0}", sample_toml());
        let config = PlugstageConfig::from_toml_str(&toml).expect("parse");
        let err = config.resolve().expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateToolchain { ref name } if name == "protobuf"));
    }

    #[rstest]
    #[case::unknown("{repository}/{channel}", "unknown placeholder {channel}")]
    #[case::unterminated("{repository}/{version", "unterminated placeholder")]
    fn rejects_bad_templates(#[case] url: &str, #[case] expected: &str) {
        let toml = sample_toml().replace(
            "{repository}/releases/download/v-{version}/{name}-linux-x86_64.gz",
            url,
        );
        let config = PlugstageConfig::from_toml_str(&toml).expect("parse");
        let err = config.resolve().expect_err("bad template");
        assert!(err.to_string().contains(expected), "unexpected error: {err}");
    }

    #[test]
    fn repository_placeholder_requires_repository() {
        let toml = sample_toml().replace(
            "repository = \"https://github.com/pactflow/pact-protobuf-plugin\"\n",
            "",
        );
        let config = PlugstageConfig::from_toml_str(&toml).expect("parse");
        let err = config.resolve().expect_err("missing repository");
        assert!(err.to_string().contains("no repository is set"));
    }

    #[rstest]
    #[case::separator("bin/plugin")]
    #[case::parent("..")]
    fn rejects_unusable_file_names(#[case] file_name: &str) {
        let toml = sample_toml().replace(
            "-linux-x86_64.gz\"\n",
            &format!("-linux-x86_64.gz\"\nfile_name = \"{file_name}\"\n"),
        );
        let config = PlugstageConfig::from_toml_str(&toml).expect("parse");
        let err = config.resolve().expect_err("bad file name");
        assert!(matches!(err, ConfigError::Invalid { .. }), "unexpected error: {err}");
    }

    #[test]
    fn rejects_empty_version() {
        let toml = sample_toml().replace("version = \"0.3.0\"", "version = \" \"");
        let config = PlugstageConfig::from_toml_str(&toml).expect("parse");
        let err = config.resolve().expect_err("empty version");
        assert!(err.to_string().contains("version must not be empty"));
    }

    #[rstest]
    #[case("https://example.test/a/pact-plugin.json", Some("pact-plugin.json"))]
    #[case("https://example.test/a/manifest.json?raw=1", Some("manifest.json"))]
    #[case("https://example.test/a/", None)]
    fn url_file_name_takes_final_segment(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(url_file_name(url).as_deref(), expected);
    }
}
