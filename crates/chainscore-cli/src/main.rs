mod display;

use anyhow::{Context, Result};
use chainscore_core::checks;
use chainscore_core::config::{load_config, load_config_from_root, Config};
use chainscore_core::{CheckRequest, LocalRepo, ScanReport};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chainscore",
    version,
    about = "chainscore: supply-chain risk scoring for repositories",
    long_about = "Score a repository's CI token permissions and dependency pinning.\n\nWorkflows, Dockerfiles and shell scripts are analyzed statically; nothing is fetched or executed."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checks against a local repository checkout
    Scan {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Run only the named check (repeatable)
        #[arg(short, long = "check", value_name = "NAME")]
        checks: Vec<String>,

        /// Configuration file (defaults to .chainscore.toml in the repository root)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exit with a failure status when any check scores below this value
        #[arg(long, value_name = "SCORE", value_parser = clap::value_parser!(i32).range(0..=10))]
        fail_under: Option<i32>,
    },

    /// List the available checks
    Checks,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Scan {
            path,
            format,
            checks,
            config,
            fail_under,
        } => cmd_scan(&path, format, checks, config.as_deref(), fail_under),
        Commands::Checks => {
            display::print_check_list(checks::registry());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("invalid RUST_LOG filter")?;

    tracing_subscriber::fmt()
        .without_time()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}

fn cmd_scan(
    path: &Path,
    format: OutputFormat,
    selected: Vec<String>,
    config_path: Option<&Path>,
    fail_under: Option<i32>,
) -> Result<ExitCode> {
    let repo = LocalRepo::open(path)?;
    let config = match config_path {
        Some(p) => load_config(p)?,
        None => load_config_from_root(path)?,
    };
    let names = effective_checks(&config, selected);

    let req = CheckRequest::new(&repo, &config);
    let results = checks::run_checks(&req, &names)
        .with_context(|| format!("Failed to scan {}", path.display()))?;
    let report = ScanReport::new(path.display().to_string(), results);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => display::print_scan_report(&report),
    }

    if report.has_runtime_errors() {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(threshold) = fail_under {
        if report.below(threshold).next().is_some() {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Flags take precedence over the configuration file.
fn effective_checks(config: &Config, selected: Vec<String>) -> Vec<String> {
    if selected.is_empty() {
        config.checks.clone()
    } else {
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::try_parse_from([
            "chainscore",
            "-vv",
            "scan",
            "repo",
            "--check",
            "Token-Permissions",
            "--format",
            "json",
            "--fail-under",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Scan {
                path,
                format,
                checks,
                fail_under,
                ..
            } => {
                assert_eq!(path, PathBuf::from("repo"));
                assert!(format == OutputFormat::Json);
                assert_eq!(checks, vec!["Token-Permissions"]);
                assert_eq!(fail_under, Some(7));
            }
            Commands::Checks => panic!("expected scan"),
        }

        assert!(Cli::try_parse_from(["chainscore", "scan", "--fail-under", "11"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            checks: vec!["Pinned-Dependencies".to_string()],
            ..Config::default()
        };
        assert_eq!(effective_checks(&config, vec![]), vec!["Pinned-Dependencies"]);
        assert_eq!(
            effective_checks(&config, vec!["Token-Permissions".to_string()]),
            vec!["Token-Permissions"]
        );
    }
}
