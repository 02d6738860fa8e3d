//! Verdict retrieval from the remote store.
//!
//! [`ResultReader::fetch_verdict`] never fails: anything that prevents a
//! verdict from being read becomes a failure-tagged [`TestResult`] whose only
//! message explains what went wrong.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fsassert_store::{RemotePath, RemoteStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::obs;
use crate::result::TestResult;

/// Retry policy for a verdict that is briefly absent.
///
/// A republishing recorder deletes the object before uploading the new one,
/// so a reader can observe a gap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 250,
        }
    }
}

/// Why a verdict could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{path} is not a valid verdict path: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("{path} does not exist")]
    Missing { path: String },

    #[error("could not check whether {path} exists: {source}")]
    Exists {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("could not create a local file for {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not copy {remote} to {}: {source}", .local.display())]
    Copy {
        remote: String,
        local: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("could not parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("results read from {path} were null")]
    Null { path: String },
}

impl ReadError {
    /// Whether the object may reappear, so another attempt is worthwhile.
    pub fn is_transient(&self) -> bool {
        match self {
            ReadError::Missing { .. } => true,
            ReadError::Copy { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Delay before the attempt following `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating at `u64::MAX` milliseconds.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Reads verdict files written by an [`AssertionRecorder`](crate::AssertionRecorder).
pub struct ResultReader {
    store: Arc<dyn RemoteStore>,
    config: ReaderConfig,
}

impl ResultReader {
    pub fn new(store: Arc<dyn RemoteStore>, config: ReaderConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Fetch and parse the verdict at `path`.
    ///
    /// Never fails. Transient absence is retried per [`ReaderConfig`]; every
    /// other problem is reported immediately as [`TestResult::fail`].
    pub async fn fetch_verdict(&self, path: &str) -> TestResult {
        let remote = match self.store.resolve_path(path) {
            Ok(remote) => remote,
            Err(source) => {
                let err = ReadError::InvalidPath {
                    path: path.to_string(),
                    source,
                };
                obs::emit_fetch_failed(path, &err);
                return TestResult::fail(err.to_string());
            }
        };

        let max_attempts = self.config.max_retries.saturating_add(1);
        for attempt in 1..=max_attempts {
            match self.try_fetch(&remote).await {
                Ok(result) => {
                    obs::emit_verdict_fetched(
                        remote.as_str(),
                        result.passed(),
                        result.failed(),
                        attempt,
                    );
                    return result;
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = backoff_delay(self.config.backoff_base_ms, attempt);
                    debug!(
                        remote = %remote,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "verdict not available yet, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    obs::emit_fetch_failed(remote.as_str(), &err);
                    return TestResult::fail(err.to_string());
                }
            }
        }

        // Loop always returns on the last attempt.
        warn!(remote = %remote, "verdict fetch exhausted attempts");
        TestResult::fail(format!("{remote} does not exist"))
    }

    /// A single fetch attempt.
    pub async fn try_fetch(&self, remote: &RemotePath) -> Result<TestResult, ReadError> {
        let exists = self
            .store
            .exists(remote)
            .await
            .map_err(|source| ReadError::Exists {
                path: remote.to_string(),
                source,
            })?;
        if !exists {
            return Err(ReadError::Missing {
                path: remote.to_string(),
            });
        }

        // Private temp file, removed when `local` drops.
        let local = tempfile::NamedTempFile::new().map_err(|source| ReadError::LocalFile {
            path: remote.to_string(),
            source,
        })?;

        self.store
            .copy_to_local(remote, local.path())
            .await
            .map_err(|source| ReadError::Copy {
                remote: remote.to_string(),
                local: local.path().to_path_buf(),
                source,
            })?;

        let contents =
            tokio::fs::read_to_string(local.path())
                .await
                .map_err(|e| ReadError::Parse {
                    path: remote.to_string(),
                    reason: e.to_string(),
                })?;

        TestResult::from_json(&contents)
            .map_err(|e| ReadError::Parse {
                path: remote.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ReadError::Null {
                path: remote.to_string(),
            })
    }
}
