//! In-process job backends (testing only)
//!
//! `TaskJobClient` runs each submitted job as a tokio task, handing it the
//! request's driver configuration; `NullJobClient` accepts submissions but
//! never returns a status handle.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use fsassert_core::RecorderConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::job::{JobClient, JobError, JobOutcome, JobRequest, JobResult, JobStatus};

/// What an in-process job sees of its launch.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    pub driver_config: BTreeMap<String, String>,
}

impl JobContext {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.driver_config.get(key).map(String::as_str)
    }

    /// Recorder configuration injected by the runner.
    pub fn recorder_config(&self) -> fsassert_core::Result<RecorderConfig> {
        RecorderConfig::from_lookup(|key| self.driver_config.get(key).cloned())
    }
}

type JobFn = Arc<dyn Fn(JobContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs submitted jobs as tokio tasks.
pub struct TaskJobClient {
    job: JobFn,
    submitted: Mutex<Vec<JobRequest>>,
}

impl TaskJobClient {
    pub fn new<F, Fut>(job: F) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            job: Arc::new(move |ctx| job(ctx).boxed()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Every request submitted so far.
    pub fn submitted(&self) -> Vec<JobRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobClient for TaskJobClient {
    async fn submit(&self, request: JobRequest) -> JobResult<Option<Box<dyn JobStatus>>> {
        self.submitted.lock().unwrap().push(request.clone());

        let ctx = JobContext {
            job_id: request.job_id.clone(),
            driver_config: request.driver_config,
        };
        let handle = tokio::spawn((self.job)(ctx));

        Ok(Some(Box::new(TaskJobStatus {
            job_id: request.job_id,
            handle: Some(handle),
            started: Instant::now(),
        })))
    }
}

/// Status handle for a job run by [`TaskJobClient`].
pub struct TaskJobStatus {
    job_id: String,
    handle: Option<JoinHandle<()>>,
    started: Instant,
}

#[async_trait]
impl JobStatus for TaskJobStatus {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn wait_for_completion(&mut self) -> JobResult<JobOutcome> {
        let handle = self.handle.as_mut().ok_or_else(|| JobError::Wait {
            job_id: self.job_id.clone(),
            reason: "job already reaped".to_string(),
        })?;

        let joined = handle.await;
        self.handle = None;

        let success = match joined {
            Ok(()) => true,
            Err(e) if e.is_panic() => false,
            Err(e) => {
                return Err(JobError::Wait {
                    job_id: self.job_id.clone(),
                    reason: e.to_string(),
                })
            }
        };
        Ok(JobOutcome {
            exit_code: None,
            success,
            duration_ms: self.started.elapsed().as_millis() as u64,
        })
    }

    async fn kill(&mut self) -> JobResult<()> {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        Ok(())
    }
}

/// Backend that never produces a status handle.
#[derive(Debug, Default)]
pub struct NullJobClient {
    submitted: Mutex<Vec<JobRequest>>,
}

impl NullJobClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<JobRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobClient for NullJobClient {
    async fn submit(&self, request: JobRequest) -> JobResult<Option<Box<dyn JobStatus>>> {
        self.submitted.lock().unwrap().push(request);
        Ok(None)
    }
}
