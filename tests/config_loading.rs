//! Behaviour-driven tests for loading and resolving `plugstage.toml`.

use std::fs;

use camino::Utf8PathBuf;
use plugstage::{ConfigError, PlugstageConfig, ResolvedToolchain};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

const REPOSITORY: &str = "https://github.com/pactflow/pact-protobuf-plugin";
const DIGEST: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

#[derive(Default)]
struct ConfigWorld {
    document: Option<String>,
    result: Option<Result<Vec<ResolvedToolchain>, ConfigError>>,
}

impl ConfigWorld {
    fn push_toolchain(&mut self, name: &str, version: &str, binary_url: &str) {
        let entry = format!(
            concat!(
                "[[toolchain]]\n",
                "name = \"{name}\"\n",
                "version = \"{version}\"\n",
                "repository = \"{repository}\"\n",
                "[toolchain.binary]\n",
                "url = \"{binary_url}\"\n",
                "sha256 = \"{digest}\"\n",
                "[toolchain.manifest]\n",
                "url = \"{{repository}}/releases/download/v-{{version}}/pact-plugin.json\"\n",
                "sha256 = \"{digest}\"\n",
            ),
            name = name,
            version = version,
            repository = REPOSITORY,
            binary_url = binary_url,
            digest = DIGEST,
        );
        self.document.get_or_insert_with(String::new).push_str(&entry);
    }

    fn resolved(&self, name: &str) -> &ResolvedToolchain {
        match self.result.as_ref() {
            Some(Ok(toolchains)) => toolchains
                .iter()
                .find(|toolchain| toolchain.name == name)
                .unwrap_or_else(|| panic!("toolchain {name} should be resolved")),
            Some(Err(error)) => panic!("expected configuration to resolve: {error}"),
            None => panic!("configuration should be loaded"),
        }
    }
}

#[fixture]
fn world() -> ConfigWorld {
    ConfigWorld::default()
}

#[given("a configuration declaring toolchain \"{name}\" version \"{version}\"")]
fn given_toolchain(world: &mut ConfigWorld, name: String, version: String) {
    world.push_toolchain(
        &name,
        &version,
        "{repository}/releases/download/v-{version}/plugin.gz",
    );
}

#[given("the configuration declares toolchain \"{name}\" version \"{version}\" again")]
fn given_repeated_toolchain(world: &mut ConfigWorld, name: String, version: String) {
    given_toolchain(world, name, version);
}

#[given("a configuration whose binary URL is \"{url}\"")]
fn given_binary_url(world: &mut ConfigWorld, url: String) {
    world.push_toolchain("protobuf", "0.3.0", &url);
}

#[given("a configuration containing an unknown field")]
fn given_unknown_field(world: &mut ConfigWorld) {
    world.push_toolchain(
        "protobuf",
        "0.3.0",
        "{repository}/releases/download/v-{version}/plugin.gz",
    );
    if let Some(document) = world.document.as_mut() {
        document.push_str("unexpected = true\n");
    }
}

#[given("no configuration file")]
fn given_no_file(world: &mut ConfigWorld) {
    world.document = None;
}

#[when("the configuration is loaded and resolved")]
fn when_loaded(world: &mut ConfigWorld) {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
    let path = root.join("plugstage.toml");
    if let Some(document) = &world.document {
        fs::write(&path, document).expect("write configuration");
    }

    let result = PlugstageConfig::load(&path).and_then(|config| config.resolve());
    world.result = Some(result);
}

#[then("toolchain \"{name}\" downloads its binary from \"{url}\"")]
fn then_binary_url(world: &mut ConfigWorld, name: String, url: String) {
    assert_eq!(world.resolved(&name).binary.url, url);
}

#[then("toolchain \"{name}\" stores its binary as \"{file_name}\"")]
fn then_binary_file_name(world: &mut ConfigWorld, name: String, file_name: String) {
    assert_eq!(world.resolved(&name).binary.file_name, file_name);
}

#[then("toolchain \"{name}\" stores its manifest as \"{file_name}\"")]
fn then_manifest_file_name(world: &mut ConfigWorld, name: String, file_name: String) {
    assert_eq!(world.resolved(&name).manifest.file_name, file_name);
}

#[then("a configuration error mentions \"{snippet}\"")]
fn then_error_mentions(world: &mut ConfigWorld, snippet: String) {
    match world.result.as_ref() {
        Some(Err(error)) => {
            let message = error.to_string();
            assert!(
                message.contains(&snippet),
                "expected '{snippet}' in error: {message}"
            );
        }
        Some(Ok(toolchains)) => {
            panic!("expected configuration loading to fail but resolved {toolchains:?}")
        }
        None => panic!("configuration should be loaded"),
    }
}

#[scenario(
    path = "tests/features/config_loading.feature",
    name = "Expand URL templates from toolchain fields"
)]
fn scenario_expand_templates(world: ConfigWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/config_loading.feature",
    name = "Reject a repeated toolchain name"
)]
fn scenario_reject_repeated_name(world: ConfigWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/config_loading.feature",
    name = "Reject an unknown placeholder"
)]
fn scenario_reject_unknown_placeholder(world: ConfigWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/config_loading.feature",
    name = "Reject unknown fields"
)]
fn scenario_reject_unknown_fields(world: ConfigWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/config_loading.feature",
    name = "Report a missing configuration file"
)]
fn scenario_missing_file(world: ConfigWorld) {
    let _ = world;
}
