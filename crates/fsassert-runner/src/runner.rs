//! Test orchestration: submit a job, wait for it, read back its verdict.
//!
//! Every exit path yields a [`TestResult`]. Environment problems (no status
//! handle, submission errors, timeouts, cancellation, unreadable verdicts)
//! become failure-tagged results instead of errors.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use fsassert_core::{obs, ResultReader, TestResult, ASSERT_FILE_PATH_KEY};
use fsassert_store::{LocalFileStore, RemoteStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Instrument};

use crate::cancel::CancelToken;
use crate::config::RunnerConfig;
use crate::job::{JobClient, JobOutcome, JobRequest, JobRequestBuilder, JobResult, JobStatus};
use crate::process::ProcessJobClient;

/// Verdict when the backend hands back no status handle.
pub const NULL_STATUS_MESSAGE: &str =
    "JobStatus returned by the Client was null. This points to an environment setup problem.";

/// Where a test run is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum TestRunState {
    /// Job description exists, nothing submitted.
    Built,
    /// Assert path generated and injected; job handed to the backend.
    Submitted { assert_path: String },
    /// Waiting for the backend to report the job finished.
    AwaitingCompletion,
    /// Backend reported the job finished.
    Completed,
    /// Verdict read back from the store.
    ResultFetched,
    /// Run ended without reaching the verdict file.
    Failed(String),
}

impl TestRunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestRunState::ResultFetched | TestRunState::Failed(_))
    }
}

impl fmt::Display for TestRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestRunState::Built => write!(f, "built"),
            TestRunState::Submitted { assert_path } => write!(f, "submitted ({assert_path})"),
            TestRunState::AwaitingCompletion => write!(f, "awaiting_completion"),
            TestRunState::Completed => write!(f, "completed"),
            TestRunState::ResultFetched => write!(f, "result_fetched"),
            TestRunState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Full account of one test run.
#[derive(Debug, Clone)]
pub struct TestRunReport {
    /// Job id, once the request was built.
    pub job_id: Option<String>,
    /// Remote path the job was told to publish to.
    pub assert_path: String,
    /// States visited, in order. The last one is terminal.
    pub states: Vec<TestRunState>,
    /// Backend outcome, when the job completed.
    pub outcome: Option<JobOutcome>,
    /// The verdict.
    pub result: TestResult,
}

impl TestRunReport {
    pub fn final_state(&self) -> &TestRunState {
        // `states` always starts with `Built`.
        &self.states[self.states.len() - 1]
    }
}

enum Wait {
    Finished(JobResult<JobOutcome>),
    TimedOut,
    Cancelled,
}

/// Submits test jobs and retrieves their verdicts.
pub struct TestRunner {
    client: Arc<dyn JobClient>,
    store: Arc<dyn RemoteStore>,
    config: RunnerConfig,
}

impl TestRunner {
    pub fn new(
        client: Arc<dyn JobClient>,
        store: Arc<dyn RemoteStore>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Runner using child processes and a directory-backed store rooted at
    /// `store_root`.
    pub fn local(store_root: impl AsRef<Path>, config: RunnerConfig) -> JobResult<Self> {
        let store = LocalFileStore::new(store_root)?;
        Ok(Self::new(
            Arc::new(ProcessJobClient::default()),
            Arc::new(store),
            config,
        ))
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn new_job_request_builder(&self) -> JobRequestBuilder {
        JobRequestBuilder::default()
    }

    /// Assert file path for a run started at `now`.
    pub fn make_assert_path(&self, now: DateTime<Local>) -> String {
        format!(
            "{}reef-assert-{}.json",
            self.config.assert_path_prefix,
            now.format("%Y%m%d%H%M%S%3f")
        )
    }

    /// Run a test job to completion and return its verdict.
    pub async fn run_test(&self, builder: JobRequestBuilder) -> TestResult {
        self.run_test_report(builder, &CancelToken::new())
            .await
            .result
    }

    /// Like [`run_test`](Self::run_test), abandoning the wait when `cancel` fires.
    pub async fn run_test_with_cancel(
        &self,
        builder: JobRequestBuilder,
        cancel: &CancelToken,
    ) -> TestResult {
        self.run_test_report(builder, cancel).await.result
    }

    /// Run a test job and report every state it passed through.
    pub async fn run_test_report(
        &self,
        builder: JobRequestBuilder,
        cancel: &CancelToken,
    ) -> TestRunReport {
        let assert_path = self.make_assert_path(Local::now());
        let mut report = TestRunReport {
            job_id: None,
            assert_path: assert_path.clone(),
            states: vec![TestRunState::Built],
            outcome: None,
            result: TestResult::new(),
        };

        let request = match builder
            .driver_config(ASSERT_FILE_PATH_KEY, assert_path.as_str())
            .build()
        {
            Ok(request) => request,
            Err(e) => return fail(report, format!("could not build job request: {e}")),
        };
        let job_id = request.job_id.clone();
        report.job_id = Some(job_id.clone());

        self.drive(request, report, cancel)
            .instrument(obs::job_span(&job_id))
            .await
    }

    async fn drive(
        &self,
        request: JobRequest,
        mut report: TestRunReport,
        cancel: &CancelToken,
    ) -> TestRunReport {
        let job_id = request.job_id.clone();
        let assert_path = report.assert_path.clone();

        obs::emit_job_submitted(&job_id, &assert_path);
        advance(
            &mut report,
            TestRunState::Submitted {
                assert_path: assert_path.clone(),
            },
        );

        let mut status = match self.client.submit(request).await {
            Ok(Some(status)) => status,
            Ok(None) => return fail(report, NULL_STATUS_MESSAGE.to_string()),
            Err(e) => return fail(report, format!("could not submit job {job_id}: {e}")),
        };

        debug!(job_id = %job_id, "Waiting for job to complete");
        advance(&mut report, TestRunState::AwaitingCompletion);

        let waited = self.wait(status.as_mut(), cancel).await;
        let outcome = match waited {
            Wait::Finished(Ok(outcome)) => outcome,
            Wait::Finished(Err(e)) => {
                return fail(report, format!("could not wait for job {job_id}: {e}"))
            }
            Wait::TimedOut => {
                kill(status.as_mut()).await;
                return fail(
                    report,
                    format!(
                        "job {job_id} did not complete within {} ms",
                        self.config.completion_timeout_ms
                    ),
                );
            }
            Wait::Cancelled => {
                kill(status.as_mut()).await;
                return fail(report, format!("job {job_id} was cancelled"));
            }
        };

        obs::emit_job_completed(&job_id, outcome.duration_ms, outcome.exit_code);
        report.outcome = Some(outcome);
        advance(&mut report, TestRunState::Completed);

        let reader = ResultReader::new(self.store.clone(), self.config.reader.clone());
        report.result = reader.fetch_verdict(&assert_path).await;
        advance(&mut report, TestRunState::ResultFetched);
        report
    }

    async fn wait(&self, status: &mut dyn JobStatus, cancel: &CancelToken) -> Wait {
        let timeout_ms = self.config.completion_timeout_ms;
        let deadline = async move {
            if timeout_ms == 0 {
                std::future::pending::<()>().await
            } else {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await
            }
        };

        tokio::select! {
            finished = status.wait_for_completion() => Wait::Finished(finished),
            _ = deadline => Wait::TimedOut,
            _ = cancel.cancelled() => Wait::Cancelled,
        }
    }
}

async fn kill(status: &mut dyn JobStatus) {
    if let Err(e) = status.kill().await {
        warn!(job_id = %status.job_id(), error = %e, "could not kill job");
    }
}

fn advance(report: &mut TestRunReport, state: TestRunState) {
    debug!(state = %state, "test run state");
    report.states.push(state);
}

fn fail(mut report: TestRunReport, reason: String) -> TestRunReport {
    obs::emit_run_failed(report.job_id.as_deref().unwrap_or("<unbuilt>"), &reason);
    report.result = TestResult::fail(reason.clone());
    advance(&mut report, TestRunState::Failed(reason));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::NullJobClient;
    use chrono::TimeZone;
    use fsassert_store::fakes::MemoryStore;

    fn runner_with_prefix(prefix: &str) -> TestRunner {
        TestRunner::new(
            Arc::new(NullJobClient::new()),
            Arc::new(MemoryStore::new()),
            RunnerConfig {
                assert_path_prefix: prefix.to_string(),
                ..RunnerConfig::default()
            },
        )
    }

    #[test]
    fn test_make_assert_path_format() {
        let runner = runner_with_prefix("/tmp/");
        let now = Local
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 2)
            .unwrap()
            + chrono::Duration::milliseconds(45);

        assert_eq!(
            runner.make_assert_path(now),
            "/tmp/reef-assert-20240307090502045.json"
        );
    }

    #[test]
    fn test_make_assert_path_uses_prefix() {
        let runner = runner_with_prefix("/dfs/asserts/");
        let path = runner.make_assert_path(Local::now());
        assert!(path.starts_with("/dfs/asserts/reef-assert-"));
        assert!(path.ends_with(".json"));
        // prefix + "reef-assert-" + 17 digit timestamp + ".json"
        assert_eq!(path.len(), "/dfs/asserts/".len() + 12 + 17 + 5);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TestRunState::ResultFetched.is_terminal());
        assert!(TestRunState::Failed("x".into()).is_terminal());
        assert!(!TestRunState::Built.is_terminal());
        assert!(!TestRunState::AwaitingCompletion.is_terminal());
    }

    #[test]
    fn test_state_display() {
        let state = TestRunState::Submitted {
            assert_path: "/tmp/a.json".into(),
        };
        assert_eq!(state.to_string(), "submitted (/tmp/a.json)");
        assert_eq!(TestRunState::Failed("boom".into()).to_string(), "failed: boom");
    }

    #[tokio::test]
    async fn test_blank_job_id_fails_before_submission() {
        let client = Arc::new(NullJobClient::new());
        let runner = TestRunner::new(
            client.clone(),
            Arc::new(MemoryStore::new()),
            RunnerConfig::default(),
        );

        let report = runner
            .run_test_report(
                runner.new_job_request_builder().job_id(" "),
                &CancelToken::new(),
            )
            .await;

        assert!(matches!(report.final_state(), TestRunState::Failed(_)));
        assert!(report.result.failure_messages()[0].starts_with("could not build job request"));
        assert!(client.submitted().is_empty());
        assert_eq!(report.job_id, None);
    }
}
