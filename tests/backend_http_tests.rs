//! HTTP backend tests against a local mock server

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use odinchat::api::{ApiError, ChatBackend, ChatRequest, HttpBackend, Role};
use odinchat::runtime::Runtime;
use odinchat::state::{ChatState, StreamOutcome, StreamPhase};
use serde_json::json;
use tokio::runtime::Handle;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> HttpBackend {
    HttpBackend::with_base_url(&format!("{}/api", server.uri())).unwrap()
}

#[tokio::test]
async fn test_list_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s2", "title": "Newer", "updated_at": "2024-05-02T10:00:00", "extra": 1},
            {"id": "s1", "title": "Older", "updated_at": "2024-05-01T09:30:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = backend_for(&server).list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "s2");
    assert!(sessions[0].updated_at.is_some());
    assert_eq!(sessions[1].title, "Older");
}

#[tokio::test]
async fn test_list_messages_decodes_roles_and_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions/s1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m1", "session_id": "s1", "role": "user", "content": "hi",
             "timestamp": "2024-05-01T09:30:00", "files": ["f1"]},
            {"id": "m2", "session_id": "s1", "role": "assistant", "content": "hello",
             "timestamp": "2024-05-01T09:30:02", "files": null}
        ])))
        .mount(&server)
        .await;

    let messages = backend_for(&server).list_messages("s1").await.unwrap();
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].files, Some(vec!["f1".to_string()]));
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].files, None);
}

#[tokio::test]
async fn test_delete_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/sessions/s1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .delete_session("s1")
        .await
        .unwrap_err();
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "database locked");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_sends_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "f-123", "filename": "notes.txt", "content_type": "text/plain", "size": 5
        })))
        .mount(&server)
        .await;

    let attachment = backend_for(&server)
        .upload("notes.txt", b"hello".to_vec())
        .await
        .unwrap();
    assert_eq!(attachment.id, "f-123");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("hello"));
}

#[tokio::test]
async fn test_stream_request_has_null_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"content\": \"ok\"}\n", "text/event-stream"),
        )
        .mount(&server)
        .await;

    let request = ChatRequest {
        message: "hi".to_string(),
        session_id: "s1".to_string(),
        files: None,
    };
    let body: Vec<_> = backend_for(&server)
        .open_stream(&request)
        .await
        .unwrap()
        .collect()
        .await;
    assert!(body.iter().all(Result::is_ok));

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        sent,
        json!({"message": "hi", "session_id": "s1", "files": null})
    );
}

#[tokio::test]
async fn test_stream_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let request = ChatRequest {
        message: "hi".to_string(),
        session_id: "s1".to_string(),
        files: None,
    };
    let result = backend_for(&server).open_stream(&request).await;
    assert!(matches!(result, Err(ApiError::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_reply_streams_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-1", "title": "New Chat", "updated_at": "2024-05-01T09:30:00"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "new-1", "title": "hello", "updated_at": "2024-05-01T09:30:05"}
        ])))
        .mount(&server)
        .await;
    let sse = concat!(
        "data: {\"content\": \"Here\"}\n\n",
        "data: {\"content\": \"Here is a page:\\n```html\\n<h1>Hi</h1>\\n```\"}\n\n",
        "data: {\"content\": \"Here is a page:\\n```html\\n<h1>Hi</h1>\\n```\", \"done\": true}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let backend = Arc::new(backend_for(&server));
    let (runtime, mut rx) = Runtime::new(backend, Handle::current());
    let mut state = ChatState::new();
    runtime.dispatch_all(state.send("hello").unwrap());

    let wait = async {
        while !matches!(state.phase(), StreamPhase::Closed(_)) {
            let event = rx.recv().await.expect("runtime alive");
            let actions = state.apply(event);
            runtime.dispatch_all(actions);
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("reply did not complete");

    assert!(matches!(
        state.phase(),
        StreamPhase::Closed(StreamOutcome::Completed)
    ));
    assert_eq!(state.active_session_id(), Some("new-1"));
    assert_eq!(
        state.messages()[1].content,
        "Here is a page:\n```html\n<h1>Hi</h1>\n```"
    );
    assert_eq!(state.preview().html(), Some("<h1>Hi</h1>\n"));
}
