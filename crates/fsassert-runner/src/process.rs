//! Child-process job backend.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::job::{JobClient, JobError, JobOutcome, JobRequest, JobResult, JobStatus};

/// Runs each job as a child process.
///
/// Driver configuration entries are exported to the child as environment
/// variables, so a job built on `fsassert-core` finds its verdict path via
/// `RecorderConfig::from_env`.
#[derive(Debug, Clone, Default)]
pub struct ProcessJobClient {
    working_dir: Option<PathBuf>,
}

impl ProcessJobClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run jobs from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl JobClient for ProcessJobClient {
    async fn submit(&self, request: JobRequest) -> JobResult<Option<Box<dyn JobStatus>>> {
        if request.command.is_empty() {
            return Err(JobError::InvalidRequest(format!(
                "job {} has empty command",
                request.job_id
            )));
        }

        let exe = &request.command[0];
        let args = &request.command[1..];

        let mut command = Command::new(exe);
        command
            .args(args)
            .envs(&request.driver_config)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| JobError::Spawn {
            job_id: request.job_id.clone(),
            source,
        })?;
        info!(job_id = %request.job_id, pid = ?child.id(), "spawned job process");

        Ok(Some(Box::new(ProcessJobStatus {
            job_id: request.job_id,
            child,
            started: Instant::now(),
        })))
    }
}

/// Status handle for a job spawned by [`ProcessJobClient`].
pub struct ProcessJobStatus {
    job_id: String,
    child: Child,
    started: Instant,
}

#[async_trait]
impl JobStatus for ProcessJobStatus {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn wait_for_completion(&mut self) -> JobResult<JobOutcome> {
        let status = self.child.wait().await.map_err(|e| JobError::Wait {
            job_id: self.job_id.clone(),
            reason: e.to_string(),
        })?;

        Ok(JobOutcome {
            exit_code: status.code(),
            success: status.success(),
            duration_ms: self.started.elapsed().as_millis() as u64,
        })
    }

    async fn kill(&mut self) -> JobResult<()> {
        debug!(job_id = %self.job_id, "killing job process");
        self.child.kill().await.map_err(|e| JobError::Wait {
            job_id: self.job_id.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(argv: &[&str]) -> JobRequest {
        JobRequest::builder()
            .job_id("process-test")
            .command(argv.iter().copied())
            .driver_config("FSASSERT_TEST_VALUE", "injected")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let client = ProcessJobClient::new();
        let mut status = client.submit(request(&["true"])).await.unwrap().unwrap();
        assert_eq!(status.job_id(), "process-test");

        let outcome = status.wait_for_completion().await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let client = ProcessJobClient::new();
        let mut status = client.submit(request(&["false"])).await.unwrap().unwrap();
        let outcome = status.wait_for_completion().await.unwrap();
        assert!(!outcome.success);
        assert_ne!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_driver_config_exported_as_env() {
        let client = ProcessJobClient::new();
        let mut status = client
            .submit(request(&[
                "sh",
                "-c",
                "test \"$FSASSERT_TEST_VALUE\" = injected",
            ]))
            .await
            .unwrap()
            .unwrap();
        assert!(status.wait_for_completion().await.unwrap().success);
    }

    #[tokio::test]
    async fn test_working_dir_applied() {
        let dir = tempfile::tempdir().unwrap();
        let client = ProcessJobClient::new().with_working_dir(dir.path());
        let mut status = client
            .submit(request(&["sh", "-c", "touch marker"]))
            .await
            .unwrap()
            .unwrap();
        status.wait_for_completion().await.unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let client = ProcessJobClient::new();
        let empty = JobRequest::builder().job_id("empty").build().unwrap();
        match client.submit(empty).await {
            Err(JobError::InvalidRequest(msg)) => assert!(msg.contains("empty command")),
            Err(other) => panic!("expected InvalidRequest, got {other:?}"),
            Ok(_) => panic!("expected InvalidRequest, got a status handle"),
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let client = ProcessJobClient::new();
        let result = client
            .submit(request(&["/definitely/not/a/real/binary"]))
            .await;
        assert!(matches!(result, Err(JobError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_kill_stops_long_running_job() {
        let client = ProcessJobClient::new();
        let mut status = client
            .submit(request(&["sleep", "30"]))
            .await
            .unwrap()
            .unwrap();

        let waited =
            tokio::time::timeout(Duration::from_millis(50), status.wait_for_completion()).await;
        assert!(waited.is_err());

        status.kill().await.unwrap();
    }
}
