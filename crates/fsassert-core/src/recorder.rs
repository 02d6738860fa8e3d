//! In-job assertion recorder.
//!
//! Every recorded assertion updates the in-memory [`TestResult`], writes it to
//! a local staging file and publishes that file to the remote store, all
//! under one lock. A job can therefore be killed at any point and the remote
//! verdict still reflects every assertion whose call returned.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fsassert_store::{RemotePath, RemoteStore};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AssertError, Result};
use crate::obs;
use crate::result::TestResult;
use crate::sync::DurablePublisher;

/// Key under which the remote verdict path is handed to a job.
pub const ASSERT_FILE_PATH_KEY: &str = "FSASSERT_ASSERT_FILE_PATH";

/// Key under which a job may override its local staging file.
pub const LOCAL_ASSERT_FILE_KEY: &str = "FSASSERT_LOCAL_ASSERT_FILE";

/// Staging file name used when none is configured.
pub const DEFAULT_LOCAL_ASSERT_FILE: &str = "asserts.json";

fn default_local_assert_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_ASSERT_FILE)
}

/// Configuration for an [`AssertionRecorder`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Remote path of the verdict file
    pub assert_file_path: String,
    /// Local file holding the latest snapshot. Relative paths resolve against
    /// the working directory, so recorders in one process may share it; each
    /// upload reads a private copy, never this file.
    #[serde(default = "default_local_assert_file")]
    pub local_assert_file_name: PathBuf,
}

impl RecorderConfig {
    pub fn new(assert_file_path: impl Into<String>) -> Self {
        Self {
            assert_file_path: assert_file_path.into(),
            local_assert_file_name: default_local_assert_file(),
        }
    }

    /// Override the local staging file.
    pub fn with_local_assert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_assert_file_name = path.into();
        self
    }

    /// Build from a key lookup, e.g. a job's driver configuration.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let assert_file_path = lookup(ASSERT_FILE_PATH_KEY)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AssertError::blank(ASSERT_FILE_PATH_KEY))?;

        let mut config = Self::new(assert_file_path);
        if let Some(local) = lookup(LOCAL_ASSERT_FILE_KEY) {
            config.local_assert_file_name = PathBuf::from(local);
        }
        Ok(config)
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Assertion surface exposed to job code.
#[async_trait]
pub trait Assert: Send + Sync {
    /// Record one assertion. `None` is an unconditional failure.
    ///
    /// `message` arrives fully formatted (`format!` any arguments first); a
    /// blank message is rejected.
    async fn record(&self, condition: Option<bool>, message: &str) -> Result<()>;

    /// Passes when `condition` holds.
    async fn assert_true(&self, condition: bool, message: &str) -> Result<()> {
        self.record(Some(condition), message).await
    }

    /// Passes when `condition` does not hold.
    async fn assert_false(&self, condition: bool, message: &str) -> Result<()> {
        self.record(Some(!condition), message).await
    }

    /// Records a failure.
    async fn fail(&self, message: &str) -> Result<()> {
        self.record(None, message).await
    }
}

struct RecorderState {
    result: TestResult,
    publisher: DurablePublisher,
}

/// Records assertions to a verdict file on a [`RemoteStore`].
///
/// One recorder owns one remote path. Concurrent callers are serialized
/// behind a single async mutex spanning mutate, stage and publish.
pub struct AssertionRecorder {
    state: Mutex<RecorderState>,
    remote_path: RemotePath,
    staging: PathBuf,
}

impl std::fmt::Debug for AssertionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionRecorder")
            .field("remote_path", &self.remote_path)
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl AssertionRecorder {
    /// Create a recorder publishing to `config.assert_file_path`.
    pub fn new(store: Arc<dyn RemoteStore>, config: RecorderConfig) -> Result<Self> {
        if config.assert_file_path.trim().is_empty() {
            return Err(AssertError::blank("assert_file_path"));
        }
        if config.local_assert_file_name.as_os_str().is_empty() {
            return Err(AssertError::blank("local_assert_file_name"));
        }

        let remote_path = store.resolve_path(&config.assert_file_path)?;
        debug!(
            remote = %remote_path,
            staging = %config.local_assert_file_name.display(),
            "initializing assertion recorder"
        );

        Ok(Self {
            state: Mutex::new(RecorderState {
                result: TestResult::new(),
                publisher: DurablePublisher::new(store, remote_path.clone()),
            }),
            remote_path,
            staging: config.local_assert_file_name,
        })
    }

    /// Remote path the verdict is published to.
    pub fn remote_path(&self) -> &RemotePath {
        &self.remote_path
    }

    /// Local staging file.
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Copy of the current in-memory result.
    pub async fn snapshot(&self) -> TestResult {
        self.state.lock().await.result.clone()
    }

    /// Write `json` to a private file next to the staging path.
    ///
    /// The upload reads this file, not the staging path, so recorders that
    /// share a staging file never publish each other's snapshots.
    async fn stage(&self, json: String) -> Result<NamedTempFile> {
        let dir = self
            .staging
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut file = NamedTempFile::new_in(&dir)?;
            file.write_all(json.as_bytes())?;
            file.as_file().sync_all()?;
            Ok::<_, io::Error>(file)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
        .and_then(|staged| staged)
        .map_err(|source| AssertError::Staging {
            path: self.staging.clone(),
            source,
        })
    }
}

#[async_trait]
impl Assert for AssertionRecorder {
    async fn record(&self, condition: Option<bool>, message: &str) -> Result<()> {
        if message.trim().is_empty() {
            return Err(AssertError::InvalidArgument {
                name: "message",
                reason: "asserts must have a message".to_string(),
            });
        }

        let mut state = self.state.lock().await;

        state.result.add(condition, message);
        let json = state.result.to_json()?;

        let staged = self.stage(json).await?;

        let replaced = state.publisher.has_published();
        let published = state.publisher.publish(staged.path()).await;
        staged
            .persist(&self.staging)
            .map_err(|e| AssertError::Staging {
                path: self.staging.clone(),
                source: e.error,
            })?;
        published?;

        obs::emit_verdict_published(self.remote_path.as_str(), replaced);
        obs::emit_assert_recorded(
            self.remote_path.as_str(),
            condition == Some(true),
            state.result.passed(),
            state.result.failed(),
        );
        Ok(())
    }
}
