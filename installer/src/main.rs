//! plugstage installer CLI entrypoint.
//!
//! This binary fetches, verifies, and registers the plugin toolchains
//! declared in `plugstage.toml`, or lists them with `list`.

use clap::Parser;
use plugstage_installer::artefact::download::HttpDownloader;
use plugstage_installer::cli::{Cli, Command};
use plugstage_installer::dirs::SystemBaseDirs;
use plugstage_installer::error::Result;
use plugstage_installer::install_flow::{install_timeout, run_install};
use plugstage_installer::list::run_list;
use plugstage_installer::output::write_stderr_line;
use plugstage_installer::telemetry::init_logging;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let dirs = SystemBaseDirs;

    if let Some(Command::List(args)) = &cli.command {
        init_logging(0, false);
        return run_list(args, &dirs, &mut std::io::stdout());
    }

    let args = cli.install_args();
    init_logging(args.verbosity, args.quiet);
    let downloader = HttpDownloader::with_timeout(install_timeout(args));
    run_install(args, &dirs, &downloader, stderr).map(|_| ())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugstage_installer::error::InstallerError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = InstallerError::DirectoryUnavailable {
            purpose: "output",
            reason: "no platform default is available".to_owned(),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: could not determine output directory"));
    }

    #[test]
    fn missing_configuration_fails_the_run() {
        let cli = Cli::parse_from([
            "plugstage-installer",
            "--config",
            "/nonexistent/plugstage.toml",
            "--output-dir",
            "/tmp/plugstage-out",
            "--no-cache",
        ]);
        let mut stderr = Vec::new();

        let result = run(&cli, &mut stderr);

        assert!(matches!(result, Err(InstallerError::Config(_))));
    }
}
