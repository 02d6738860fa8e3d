//! Structured observability hooks for assertion and test-run lifecycle events.
//!
//! This module provides:
//! - Job-scoped tracing spans via [`job_span`]
//! - Emission functions for key lifecycle events: assertion recorded, verdict
//!   published, job submitted/completed, verdict fetched
//!
//! Events are emitted at `info!` (lifecycle) or `debug!` (per assertion)
//! level; filter with `RUST_LOG`.

use tracing::{debug, info, warn};

/// Job-scoped tracing span.
///
/// Attach it to the future that drives a job so every event carries the job id.
///
/// # Example
///
/// ```ignore
/// runner.run_test(builder).instrument(job_span("job-12345")).await;
/// ```
pub fn job_span(job_id: &str) -> tracing::Span {
    tracing::info_span!("fsassert.job", job_id = %job_id)
}

/// Emit event: one assertion was recorded and published.
pub fn emit_assert_recorded(remote_path: &str, held: bool, passed: u64, failed: u64) {
    debug!(
        event = "assert.recorded",
        remote_path = %remote_path,
        held = held,
        passed = passed,
        failed = failed,
    );
}

/// Emit event: the verdict file was uploaded.
pub fn emit_verdict_published(remote_path: &str, replaced: bool) {
    debug!(event = "verdict.published", remote_path = %remote_path, replaced = replaced);
}

/// Emit event: a job was handed to the backend.
pub fn emit_job_submitted(job_id: &str, assert_path: &str) {
    info!(event = "job.submitted", job_id = %job_id, assert_path = %assert_path);
}

/// Emit event: the backend reported the job finished.
pub fn emit_job_completed(job_id: &str, duration_ms: u64, exit_code: Option<i32>) {
    info!(
        event = "job.completed",
        job_id = %job_id,
        duration_ms = duration_ms,
        exit_code = ?exit_code,
    );
}

/// Emit event: a verdict was read back from the store.
pub fn emit_verdict_fetched(remote_path: &str, passed: u64, failed: u64, attempts: u32) {
    info!(
        event = "verdict.fetched",
        remote_path = %remote_path,
        passed = passed,
        failed = failed,
        attempts = attempts,
    );
}

/// Emit event: no verdict could be produced (warning level).
pub fn emit_fetch_failed(remote_path: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "verdict.fetch_failed", remote_path = %remote_path, reason = %reason);
}

/// Emit event: the test run ended without a verdict from the job (warning level).
pub fn emit_run_failed(job_id: &str, reason: &str) {
    warn!(event = "run.failed", job_id = %job_id, reason = %reason);
}
