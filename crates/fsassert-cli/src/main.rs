//! fsassert - run test jobs and read back their verdicts
//!
//! ## Commands
//!
//! - `run`: run a command as a test job and report the verdict it published
//! - `fetch`: read and print an existing verdict file
//!
//! Both commands exit non-zero when the verdict did not succeed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fsassert_core::{ResultReader, TestResult};
use fsassert_runner::{CancelToken, RunnerConfig, TestRunReport, TestRunState, TestRunner};
use fsassert_store::LocalFileStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "fsassert")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run test jobs and read back the verdicts they publish", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Verdict output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command as a test job and report its verdict
    Run {
        /// Runner configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Prefix for the generated assert file path
        #[arg(long, env = "FSASSERT_ASSERT_PREFIX")]
        prefix: Option<String>,

        /// Completion timeout in milliseconds (0 waits forever)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Directory the store resolves remote paths under
        #[arg(long, env = "FSASSERT_STORE_ROOT", default_value = "/")]
        store_root: PathBuf,

        /// Job id (generated when omitted)
        #[arg(long)]
        job_id: Option<String>,

        /// Command to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Read a verdict file and print it
    Fetch {
        /// Remote path of the verdict file
        path: String,

        /// Directory the store resolves remote paths under
        #[arg(long, env = "FSASSERT_STORE_ROOT", default_value = "/")]
        store_root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    fsassert_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Run {
            config,
            prefix,
            timeout_ms,
            store_root,
            job_id,
            command,
        } => {
            let config = resolve_run_config(config.as_deref(), prefix, timeout_ms)?;
            let report = cmd_run(&store_root, config, job_id, command).await?;
            print_report(&report, cli.output)?;
            report.result
        }
        Commands::Fetch { path, store_root } => {
            let result = cmd_fetch(&store_root, &path).await?;
            print_result(&result, cli.output)?;
            result
        }
    };

    if !result.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

/// Runner configuration from an optional file, with flag overrides applied.
fn resolve_run_config(
    path: Option<&Path>,
    prefix: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<RunnerConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid runner config in {:?}", path))?
        }
        None => RunnerConfig::default(),
    };

    if let Some(prefix) = prefix {
        config.assert_path_prefix = prefix;
    }
    if let Some(timeout_ms) = timeout_ms {
        config.completion_timeout_ms = timeout_ms;
    }
    Ok(config)
}

async fn cmd_run(
    store_root: &Path,
    config: RunnerConfig,
    job_id: Option<String>,
    command: Vec<String>,
) -> Result<TestRunReport> {
    let runner = TestRunner::local(store_root, config)
        .with_context(|| format!("Failed to open store at {:?}", store_root))?;

    let mut builder = runner.new_job_request_builder().command(command);
    if let Some(job_id) = job_id {
        builder = builder.job_id(job_id);
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping job");
                cancel.cancel();
            }
        });
    }

    Ok(runner.run_test_report(builder, &cancel).await)
}

async fn cmd_fetch(store_root: &Path, path: &str) -> Result<TestResult> {
    let store = LocalFileStore::new(store_root)
        .with_context(|| format!("Failed to open store at {:?}", store_root))?;
    let reader = ResultReader::new(Arc::new(store), Default::default());
    Ok(reader.fetch_verdict(path).await)
}

#[derive(Serialize)]
struct RunSummary<'a> {
    job_id: Option<&'a str>,
    assert_path: &'a str,
    states: &'a [TestRunState],
    exit_code: Option<i32>,
    result: &'a TestResult,
}

fn print_report(report: &TestRunReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            let summary = RunSummary {
                job_id: report.job_id.as_deref(),
                assert_path: &report.assert_path,
                states: &report.states,
                exit_code: report.outcome.as_ref().and_then(|o| o.exit_code),
                result: &report.result,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            if let Some(job_id) = &report.job_id {
                println!("Job:     {}", job_id);
            }
            println!("Verdict: {}", report.assert_path);
            println!("State:   {}", report.final_state());
            print!("{}", render_text(&report.result));
        }
    }
    Ok(())
}

fn print_result(result: &TestResult, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => print!("{}", render_text(result)),
    }
    Ok(())
}

fn render_text(result: &TestResult) -> String {
    let mut text = result.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "fsassert",
            "--output",
            "json",
            "run",
            "--prefix",
            "/dfs/",
            "--job-id",
            "j1",
            "--",
            "sh",
            "-c",
            "exit 0",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Run {
                prefix,
                job_id,
                command,
                ..
            } => {
                assert_eq!(prefix.as_deref(), Some("/dfs/"));
                assert_eq!(job_id.as_deref(), Some("j1"));
                assert_eq!(command, vec!["sh", "-c", "exit 0"]);
            }
            Commands::Fetch { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_run_requires_command() {
        assert!(Cli::try_parse_from(["fsassert", "run"]).is_err());
    }

    #[test]
    fn test_resolve_run_config_defaults() {
        let config = resolve_run_config(None, None, None).unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_resolve_run_config_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.json");
        std::fs::write(
            &path,
            r#"{"assert_path_prefix": "/from-file/", "completion_timeout_ms": 5000}"#,
        )
        .unwrap();

        let config = resolve_run_config(Some(&path), None, Some(0)).unwrap();
        assert_eq!(config.assert_path_prefix, "/from-file/");
        assert_eq!(config.completion_timeout_ms, 0);

        let config = resolve_run_config(Some(&path), Some("/flag/".into()), None).unwrap();
        assert_eq!(config.assert_path_prefix, "/flag/");
        assert_eq!(config.completion_timeout_ms, 5000);
    }

    #[test]
    fn test_resolve_run_config_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.json");
        std::fs::write(&path, "not json").unwrap();

        let err = resolve_run_config(Some(&path), None, None).unwrap_err();
        assert!(err.to_string().contains("Invalid runner config"));
    }

    #[tokio::test]
    async fn test_cmd_fetch_reads_verdict_under_root() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("asserts")).unwrap();
        std::fs::write(
            root.path().join("asserts/v.json"),
            r#"{"NumberOfPassedAsserts":4,"NumberOfFailedAsserts":0,"FailureMessages":[]}"#,
        )
        .unwrap();

        let result = cmd_fetch(root.path(), "/asserts/v.json").await.unwrap();
        assert!(result.succeeded());
        assert_eq!(result.passed(), 4);
    }

    #[tokio::test]
    async fn test_cmd_run_reports_shell_verdict() {
        let root = tempfile::tempdir().unwrap();
        let config = RunnerConfig {
            assert_path_prefix: "/asserts/".into(),
            ..RunnerConfig::default()
        };
        let script = format!(
            r#"mkdir -p "{root}/asserts" && printf '{{"NumberOfPassedAsserts":0,"NumberOfFailedAsserts":1,"FailureMessages":["bad"]}}' > "{root}$FSASSERT_ASSERT_FILE_PATH""#,
            root = root.path().display()
        );

        let report = cmd_run(
            root.path(),
            config,
            Some("cli-run".into()),
            vec!["sh".into(), "-c".into(), script],
        )
        .await
        .unwrap();

        assert_eq!(report.job_id.as_deref(), Some("cli-run"));
        assert_eq!(report.result.failure_messages(), ["bad"]);
        assert_eq!(report.final_state(), &TestRunState::ResultFetched);
    }

    #[test]
    fn test_render_text_ends_with_newline() {
        let text = render_text(&TestResult::fail("boom"));
        assert!(text.contains("boom"));
        assert!(text.ends_with('\n'));
    }
}
