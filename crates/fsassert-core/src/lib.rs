//! fsassert Core Library
//!
//! Assertion recording inside a job and verdict retrieval outside it:
//! - `TestResult`: the verdict snapshot and its JSON file format
//! - `AssertionRecorder`: records assertions and republishes the verdict after each one
//! - `DurablePublisher`: delete-then-upload publication to a whole-object store
//! - `ResultReader`: reads a verdict back without ever failing
//!
//! The job and the reader never share memory; the `RemoteStore` from
//! `fsassert-store` is the only channel between them.

pub mod error;
pub mod obs;
pub mod reader;
pub mod recorder;
pub mod result;
pub mod sync;
pub mod telemetry;

pub use error::{AssertError, Result};
pub use obs::{
    emit_assert_recorded, emit_fetch_failed, emit_job_completed, emit_job_submitted,
    emit_run_failed, emit_verdict_fetched, emit_verdict_published, job_span,
};
pub use reader::{ReadError, ReaderConfig, ResultReader};
pub use recorder::{
    Assert, AssertionRecorder, RecorderConfig, ASSERT_FILE_PATH_KEY, DEFAULT_LOCAL_ASSERT_FILE,
    LOCAL_ASSERT_FILE_KEY,
};
pub use result::TestResult;
pub use sync::DurablePublisher;
pub use telemetry::init_tracing;

pub use fsassert_store::{LocalFileStore, RemotePath, RemoteStore, StoreError};

/// fsassert version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
