//! Error types for assertion recording and verdict handling

use std::path::PathBuf;

use fsassert_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssertError {
    /// A required argument was blank or otherwise unusable. Programming error.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("could not write staging file `{path}`: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AssertError {
    pub(crate) fn blank(name: &'static str) -> Self {
        AssertError::InvalidArgument {
            name,
            reason: "must not be blank".to_string(),
        }
    }
}

/// Result type for assertion operations
pub type Result<T> = std::result::Result<T, AssertError>;
