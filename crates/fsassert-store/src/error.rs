//! Error types for fsassert-store

use thiserror::Error;

/// Errors that can occur while talking to a remote store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The path cannot be addressed by this store
    #[error("invalid remote path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The object does not exist
    #[error("remote object not found: {path}")]
    NotFound { path: String },

    /// Upload targeted an object that is already present
    #[error("remote object already exists: {path}")]
    AlreadyExists { path: String },

    /// Local or backing filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("store backend failed: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error means the object was absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants() {
        let err = StoreError::NotFound {
            path: "/tmp/x".into(),
        };
        assert!(err.is_not_found());

        let io = StoreError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(io.is_not_found());

        let other = StoreError::Backend("boom".into());
        assert!(!other.is_not_found());
    }

    #[test]
    fn display_includes_path() {
        let err = StoreError::AlreadyExists {
            path: "/tmp/reef-assert-1.json".into(),
        };
        assert_eq!(
            err.to_string(),
            "remote object already exists: /tmp/reef-assert-1.json"
        );
    }
}
