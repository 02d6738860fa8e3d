//! Recorder -> store -> reader over a real directory-backed store.

use std::sync::Arc;

use fsassert_core::{
    Assert, AssertionRecorder, LocalFileStore, ReaderConfig, RecorderConfig, ResultReader,
    RemoteStore, TestResult,
};

fn reader_for(store: Arc<dyn RemoteStore>) -> ResultReader {
    ResultReader::new(
        store,
        ReaderConfig {
            max_retries: 0,
            backoff_base_ms: 1,
        },
    )
}

#[tokio::test]
async fn recorded_verdict_reads_back() {
    let root = tempfile::tempdir().unwrap();
    let job_dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RemoteStore> = Arc::new(LocalFileStore::new(root.path()).unwrap());

    let recorder = AssertionRecorder::new(
        store.clone(),
        RecorderConfig::new("/tmp/reef-assert-20240102030405006.json")
            .with_local_assert_file(job_dir.path().join("asserts.json")),
    )
    .unwrap();

    recorder.assert_true(true, "connected").await.unwrap();
    recorder.assert_false(true, "should not be set").await.unwrap();
    recorder.fail("x").await.unwrap();

    let verdict = reader_for(store)
        .fetch_verdict("/tmp/reef-assert-20240102030405006.json")
        .await;
    assert_eq!(verdict.passed(), 1);
    assert_eq!(verdict.failed(), 2);
    assert_eq!(verdict.failure_messages(), ["should not be set", "x"]);
}

#[tokio::test]
async fn verdict_file_on_disk_matches_wire_format() {
    let root = tempfile::tempdir().unwrap();
    let job_dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RemoteStore> = Arc::new(LocalFileStore::new(root.path()).unwrap());

    let recorder = AssertionRecorder::new(
        store,
        RecorderConfig::new("/out/verdict.json")
            .with_local_assert_file(job_dir.path().join("asserts.json")),
    )
    .unwrap();
    recorder.assert_true(true, "ok").await.unwrap();
    recorder.fail("boom").await.unwrap();

    let raw = std::fs::read_to_string(root.path().join("out/verdict.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["NumberOfPassedAsserts"], 1);
    assert_eq!(value["NumberOfFailedAsserts"], 1);
    assert_eq!(value["FailureMessages"], serde_json::json!(["boom"]));
}

#[tokio::test]
async fn verdict_from_missing_file_never_panics() {
    let root = tempfile::tempdir().unwrap();
    let store: Arc<dyn RemoteStore> = Arc::new(LocalFileStore::new(root.path()).unwrap());

    let verdict = reader_for(store).fetch_verdict("/tmp/never-written.json").await;
    assert_eq!(verdict.failed(), 1);
    assert!(verdict.failure_messages()[0].contains("does not exist"));
}

#[tokio::test]
async fn verdict_from_malformed_file_reports_parse_error() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("tmp")).unwrap();
    std::fs::write(root.path().join("tmp/garbage.json"), "[1, 2").unwrap();
    let store: Arc<dyn RemoteStore> = Arc::new(LocalFileStore::new(root.path()).unwrap());

    let verdict = reader_for(store).fetch_verdict("/tmp/garbage.json").await;
    assert_eq!(verdict.failed(), 1);
    assert!(verdict.failure_messages()[0].starts_with("could not parse /tmp/garbage.json"));
    assert_ne!(verdict, TestResult::new());
}
