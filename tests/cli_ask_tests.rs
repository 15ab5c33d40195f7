//! One-shot CLI mode tests

use std::sync::Arc;

use odinchat::api::{FakeBackend, FakeOp, Message, Role, Session};
use odinchat::cli::dispatch::{run_ask_mode, run_delete_mode, run_sessions_mode};
use odinchat::cli::{exit_code_for, Error, EXIT_FAILURE};

#[tokio::test]
async fn test_ask_prints_reply_once() {
    let backend = Arc::new(FakeBackend::new().with_stream([
        "data: {\"content\": \"Hel\"}\n",
        "data: {\"content\": \"Hello\"}\n",
        "data: {\"content\": \"Hello, world\"}\n",
    ]));
    let mut out = Vec::new();
    run_ask_mode(Arc::clone(&backend), "hi", None, &[], &mut out)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "Hello, world\n");
    assert_eq!(backend.sessions().len(), 1);
    assert_eq!(backend.chat_requests()[0].session_id, backend.sessions()[0].id);
}

#[tokio::test]
async fn test_ask_continues_existing_session() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_sessions(vec![Session {
                id: "s1".to_string(),
                title: "Trip".to_string(),
                updated_at: None,
            }])
            .with_messages("s1", vec![Message::new("s1", Role::User, "plan a trip")])
            .with_stream(["data: {\"content\": \"Sure\"}\n"]),
    );
    let mut out = Vec::new();
    run_ask_mode(Arc::clone(&backend), "go on", Some("s1"), &[], &mut out)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "Sure\n");
    assert_eq!(backend.chat_requests()[0].session_id, "s1");
    assert_eq!(backend.sessions().len(), 1);
}

#[tokio::test]
async fn test_ask_with_attachment() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "a,b\n1,2\n").unwrap();

    let backend = Arc::new(FakeBackend::new().with_stream(["data: {\"content\": \"2 rows\"}\n"]));
    let mut out = Vec::new();
    run_ask_mode(Arc::clone(&backend), "count rows", None, &[path], &mut out)
        .await
        .unwrap();

    assert_eq!(backend.uploads(), vec![("data.csv".to_string(), 8)]);
    let files = backend.chat_requests()[0].files.clone().unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_ask_stream_failure_exits_nonzero() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail(FakeOp::OpenStream);
    let mut out = Vec::new();
    let err = run_ask_mode(backend, "hi", None, &[], &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Failed(_)));
    assert_eq!(exit_code_for(&err), EXIT_FAILURE);
}

#[tokio::test]
async fn test_sessions_and_delete_modes() {
    let backend = FakeBackend::new().with_sessions(vec![Session {
        id: "s1".to_string(),
        title: "Trip".to_string(),
        updated_at: None,
    }]);
    let table = run_sessions_mode(&backend, false).await.unwrap();
    assert!(table.contains("Trip"));

    let out = run_delete_mode(&backend, "s1").await.unwrap();
    assert!(out.contains("s1"));
    assert_eq!(
        run_sessions_mode(&backend, false).await.unwrap(),
        "No sessions.\n"
    );
}
