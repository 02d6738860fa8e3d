//! fsassert Runner
//!
//! Runs a test job on an execution backend and turns the verdict file the
//! job published into a [`TestResult`](fsassert_core::TestResult):
//! - `JobClient` / `JobStatus`: the execution backend seam
//! - `ProcessJobClient`: runs jobs as child processes
//! - `TestRunner`: submit, bounded wait, verdict retrieval
//! - `CancelToken`: abandons a run from another task

pub mod cancel;
pub mod config;
pub mod fakes;
pub mod job;
pub mod process;
pub mod runner;

pub use cancel::CancelToken;
pub use config::{RunnerConfig, DEFAULT_ASSERT_PATH_PREFIX, DEFAULT_COMPLETION_TIMEOUT_MS};
pub use job::{
    JobClient, JobError, JobOutcome, JobRequest, JobRequestBuilder, JobResult, JobStatus,
};
pub use process::{ProcessJobClient, ProcessJobStatus};
pub use runner::{TestRunReport, TestRunState, TestRunner, NULL_STATUS_MESSAGE};
