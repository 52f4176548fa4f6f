//! Tests for the install command flow.

use super::*;
use crate::dirs::MockBaseDirs;
use crate::test_utils::{StubDownloader, gzip, plugin_manifest_json, sha256_hex};
use rstest::{fixture, rstest};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BINARY_URL: &str = "https://plugins.example.test/protobuf-0.3.0.gz";
const MANIFEST_URL: &str = "https://plugins.example.test/pact-plugin.json";

struct Project {
    _temp: TempDir,
    root: Utf8PathBuf,
    archive: Vec<u8>,
    manifest: Vec<u8>,
}

impl Project {
    fn args(&self) -> InstallArgs {
        InstallArgs {
            config: Some(self.root.join("plugstage.toml")),
            cache_dir: Some(self.root.join("cache")),
            output_dir: Some(self.root.join("out")),
            ..InstallArgs::default()
        }
    }

    fn downloader(&self) -> StubDownloader {
        StubDownloader::new()
            .serving(BINARY_URL, self.archive.clone())
            .serving(MANIFEST_URL, self.manifest.clone())
    }
}

#[fixture]
fn project() -> Project {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
    let archive = gzip(b"plugin-binary-content");
    let manifest = plugin_manifest_json("protobuf", "protobuf").into_bytes();
    let config = format!(
        concat!(
            "[[toolchain]]\n",
            "name = \"protobuf\"\n",
            "version = \"0.3.0\"\n",
            "repository = \"https://plugins.example.test\"\n",
            "[toolchain.binary]\n",
            "url = \"{{repository}}/{{name}}-{{version}}.gz\"\n",
            "sha256 = \"{binary}\"\n",
            "[toolchain.manifest]\n",
            "url = \"{{repository}}/pact-plugin.json\"\n",
            "sha256 = \"{manifest}\"\n",
        ),
        binary = sha256_hex(&archive),
        manifest = sha256_hex(&manifest),
    );
    fs::write(root.join("plugstage.toml"), config).expect("write config");
    Project {
        _temp: temp,
        root,
        archive,
        manifest,
    }
}

#[rstest]
fn install_registers_configured_toolchain(project: Project) {
    let downloader = project.downloader();
    let mut stderr = Vec::new();

    let registry = run_install(&project.args(), &MockBaseDirs::new(), &downloader, &mut stderr)
        .expect("install")
        .expect("registry");

    let handle = registry.get("protobuf").expect("protobuf registered");
    assert_eq!(
        handle.artefact().path(),
        project.root.join("out").join("protobuf").join("protobuf")
    );
    assert_eq!(
        fs::read(handle.artefact().path()).expect("read binary"),
        b"plugin-binary-content"
    );
    let stderr = String::from_utf8(stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Successfully registered 1 toolchain"));
}

#[rstest]
fn dry_run_downloads_nothing(project: Project) {
    let downloader = project.downloader();
    let args = InstallArgs {
        dry_run: true,
        ..project.args()
    };
    let mut stderr = Vec::new();

    let outcome =
        run_install(&args, &MockBaseDirs::new(), &downloader, &mut stderr).expect("dry run");

    assert!(outcome.is_none());
    assert_eq!(downloader.requests(BINARY_URL), 0);
    assert!(!project.root.join("out").exists());
    let stderr = String::from_utf8(stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Dry run"));
    assert!(stderr.contains(BINARY_URL));
}

#[rstest]
fn quiet_install_prints_nothing(project: Project) {
    let args = InstallArgs {
        quiet: true,
        ..project.args()
    };
    let mut stderr = Vec::new();

    run_install(&args, &MockBaseDirs::new(), &project.downloader(), &mut stderr).expect("install");

    assert!(stderr.is_empty(), "expected no stderr output in quiet mode");
}

#[rstest]
fn failed_toolchain_is_reported(project: Project) {
    let downloader = StubDownloader::new().serving(MANIFEST_URL, project.manifest.clone());

    let err = run_install(&project.args(), &MockBaseDirs::new(), &downloader, &mut Vec::new())
        .expect_err("binary missing");

    assert!(
        matches!(err, InstallerError::Materialise { ref failures } if failures.len() == 1),
        "unexpected error: {err}"
    );
    assert!(err.is_transient());
}

#[rstest]
fn no_cache_skips_cache_directory(project: Project) {
    let args = InstallArgs {
        cache_dir: None,
        no_cache: true,
        ..project.args()
    };

    let plan = plan_install(&args, &MockBaseDirs::new()).expect("plan");

    assert_eq!(plan.cache_dir, None);
}

#[rstest]
fn plan_falls_back_to_platform_directories(project: Project) {
    let platform = project.root.join("platform");
    let args = InstallArgs {
        cache_dir: None,
        output_dir: None,
        ..project.args()
    };
    let mut dirs = MockBaseDirs::new();
    let cache = PathBuf::from(platform.join("cache").as_str());
    let data = PathBuf::from(platform.join("data").as_str());
    dirs.expect_cache_dir().return_once(move || Some(cache));
    dirs.expect_data_dir().return_once(move || Some(data));

    let plan = plan_install(&args, &dirs).expect("plan");

    assert_eq!(plan.cache_dir, Some(platform.join("cache")));
    assert_eq!(plan.output_dir, platform.join("data").join("toolchains"));
    assert_eq!(plan.requests.len(), 1);
}

#[rstest]
fn unrepresentable_timeout_installs_without_a_deadline(project: Project) {
    let args = InstallArgs {
        timeout_secs: Some(u64::MAX),
        ..project.args()
    };
    let downloader = project.downloader();

    let registry = run_install(&args, &MockBaseDirs::new(), &downloader, &mut Vec::new())
        .expect("install")
        .expect("registry");

    assert!(registry.get("protobuf").is_some());
}

#[rstest]
#[case::default(None, DEFAULT_DOWNLOAD_TIMEOUT)]
#[case::explicit(Some(42), Duration::from_secs(42))]
fn timeout_comes_from_flag(#[case] secs: Option<u64>, #[case] expected: Duration) {
    let args = InstallArgs {
        timeout_secs: secs,
        ..InstallArgs::default()
    };
    assert_eq!(install_timeout(&args), expected);
}

#[rstest]
fn invalid_checksum_is_rejected_before_downloading(project: Project) {
    let config = concat!(
        "[[toolchain]]\n",
        "name = \"protobuf\"\n",
        "version = \"0.3.0\"\n",
        "[toolchain.binary]\n",
        "url = \"https://plugins.example.test/plugin.gz\"\n",
        "sha256 = \"not-a-digest\"\n",
        "[toolchain.manifest]\n",
        "url = \"https://plugins.example.test/pact-plugin.json\"\n",
        "sha256 = \"not-a-digest\"\n",
    );
    fs::write(project.root.join("plugstage.toml"), config).expect("write config");

    let err = plan_install(&project.args(), &MockBaseDirs::new()).expect_err("bad digest");

    assert!(
        matches!(err, InstallerError::InvalidArtefact { ref toolchain, .. } if toolchain == "protobuf"),
        "unexpected error: {err}"
    );
}
