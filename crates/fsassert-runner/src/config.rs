//! Test runner configuration.

use fsassert_core::ReaderConfig;
use serde::{Deserialize, Serialize};

/// Assert files land under `/tmp/` unless configured otherwise.
pub const DEFAULT_ASSERT_PATH_PREFIX: &str = "/tmp/";

/// Jobs get an hour to finish before they are killed.
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Options for a [`TestRunner`](crate::TestRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Prefix of every generated assert file path.
    pub assert_path_prefix: String,

    /// Maximum wait for the job to finish (milliseconds, 0 = unbounded).
    pub completion_timeout_ms: u64,

    /// Retry policy used when reading the verdict back.
    pub reader: ReaderConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            assert_path_prefix: DEFAULT_ASSERT_PATH_PREFIX.to_string(),
            completion_timeout_ms: DEFAULT_COMPLETION_TIMEOUT_MS,
            reader: ReaderConfig::default(),
        }
    }
}
