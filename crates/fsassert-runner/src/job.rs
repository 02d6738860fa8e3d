//! Job descriptions and the execution backend seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by job backends.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid job request: {0}")]
    InvalidRequest(String),

    #[error("could not start job {job_id}: {source}")]
    Spawn {
        job_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lost track of job {job_id}: {reason}")]
    Wait { job_id: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] fsassert_store::StoreError),
}

/// Result type for job backend operations.
pub type JobResult<T> = std::result::Result<T, JobError>;

/// A job ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Identifier used in logs and by the backend.
    pub job_id: String,

    /// Command to execute (first element is executable). Backends that run
    /// in-process code may ignore it.
    pub command: Vec<String>,

    /// Launch configuration handed to the job's own code.
    pub driver_config: BTreeMap<String, String>,
}

impl JobRequest {
    pub fn builder() -> JobRequestBuilder {
        JobRequestBuilder::default()
    }
}

/// Builder for [`JobRequest`].
#[derive(Debug, Clone, Default)]
pub struct JobRequestBuilder {
    job_id: Option<String>,
    command: Vec<String>,
    driver_config: BTreeMap<String, String>,
}

impl JobRequestBuilder {
    /// Set the job id. A random UUID is used when unset.
    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Set the command line.
    pub fn command<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = argv.into_iter().map(Into::into).collect();
        self
    }

    /// Add one launch configuration entry, replacing any previous value.
    pub fn driver_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.driver_config.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> JobResult<JobRequest> {
        let job_id = match self.job_id {
            Some(id) if id.trim().is_empty() => {
                return Err(JobError::InvalidRequest("job id must not be blank".into()))
            }
            Some(id) => id,
            None => format!("fsassert-{}", uuid::Uuid::new_v4()),
        };

        Ok(JobRequest {
            job_id,
            command: self.command,
            driver_config: self.driver_config,
        })
    }
}

/// How a job ended, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Exit code, when the backend has one.
    pub exit_code: Option<i32>,

    /// Whether the backend considers the job successful. Informational only:
    /// the verdict comes from the assertion file.
    pub success: bool,

    /// Wall-clock time from submission to completion.
    pub duration_ms: u64,
}

/// Handle to a submitted job.
#[async_trait]
pub trait JobStatus: Send {
    fn job_id(&self) -> &str;

    /// Wait until the job has finished running.
    ///
    /// Must be cancel-safe: the runner drops this future on timeout and then
    /// calls [`JobStatus::kill`].
    async fn wait_for_completion(&mut self) -> JobResult<JobOutcome>;

    /// Stop the job.
    async fn kill(&mut self) -> JobResult<()>;
}

/// Execution backend.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit a job. `Ok(None)` means the backend accepted the call but
    /// produced no status handle, which points at a broken environment.
    async fn submit(&self, request: JobRequest) -> JobResult<Option<Box<dyn JobStatus>>>;
}
