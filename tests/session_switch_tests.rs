//! Session lifecycle integration tests
//!
//! Drives `ChatState` through the real `Runtime` against `FakeBackend`:
//! switching, implicit creation, deletion and failure isolation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use odinchat::api::{FakeBackend, FakeOp, Message, Role, Session};
use odinchat::events::{Action, ClientEvent, EventReceiver};
use odinchat::runtime::Runtime;
use odinchat::state::{ChatState, NoticeLevel, StreamOutcome, StreamPhase, STREAM_FAILURE_TEXT};
use tokio::runtime::Handle;

fn session(id: &str, title: &str) -> Session {
    Session {
        id: id.to_string(),
        title: title.to_string(),
        updated_at: None,
    }
}

struct Harness {
    state: ChatState,
    runtime: Runtime<FakeBackend>,
    rx: EventReceiver,
}

impl Harness {
    fn new(backend: FakeBackend) -> Self {
        let (runtime, rx) = Runtime::new(Arc::new(backend), Handle::current());
        Self {
            state: ChatState::new(),
            runtime,
            rx,
        }
    }

    fn backend(&self) -> &FakeBackend {
        self.runtime.backend()
    }

    fn dispatch(&self, actions: Vec<Action>) {
        self.runtime.dispatch_all(actions);
    }

    /// Apply events until `done` holds (panics after five seconds)
    async fn settle(&mut self, done: impl Fn(&ChatState) -> bool) {
        let wait = async {
            while !done(&self.state) {
                let event = self.rx.recv().await.expect("runtime alive");
                let actions = self.state.apply(event);
                self.runtime.dispatch_all(actions);
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("state did not settle");
    }

    async fn open(&mut self, id: &str) {
        let actions = self.state.select_session(id);
        self.dispatch(actions);
        let id = id.to_string();
        self.settle(move |s| s.active_session_id() == Some(id.as_str()))
            .await;
    }
}

fn closed(state: &ChatState) -> bool {
    matches!(state.phase(), StreamPhase::Closed(_))
}

#[tokio::test]
async fn test_send_without_session_creates_one_first() {
    let backend = FakeBackend::new().with_stream(["data: {\"content\": \"Hi there\"}\n"]);
    let mut h = Harness::new(backend);

    let actions = h.state.send("hello").unwrap();
    assert_eq!(actions, vec![Action::CreateSession]);
    assert!(!h.state.can_send());
    h.dispatch(actions);
    h.settle(closed).await;

    let requests = h.backend().chat_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "hello");
    assert_eq!(Some(requests[0].session_id.as_str()), h.state.active_session_id());

    let messages = h.state.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].content, "Hi there");
    assert_eq!(h.state.sessions().sessions()[0].id, requests[0].session_id);
}

#[tokio::test]
async fn test_switch_mid_stream_leaves_new_session_untouched() {
    let history = vec![Message::new("b", Role::User, "earlier question")];
    let backend = FakeBackend::new()
        .with_sessions(vec![session("a", "First"), session("b", "Second")])
        .with_messages("b", history.clone())
        .with_stream([
            "data: {\"content\": \"par\"}\n",
            "data: {\"content\": \"partial\"}\n",
            "data: {\"content\": \"partial reply\"}\n",
        ]);
    let mut h = Harness::new(backend);
    h.open("a").await;

    let actions = h.state.send("question for a").unwrap();
    h.dispatch(actions);
    // Switch before any stream event has been applied
    let actions = h.state.select_session("b");
    h.dispatch(actions);
    h.settle(|s| s.active_session_id() == Some("b")).await;

    // Let every remaining event of the old stream arrive
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(event) = h.rx.try_recv() {
        h.state.apply(event);
    }

    assert_eq!(h.state.messages(), history.as_slice());
    assert!(h.state.can_send());
    assert!(h.state.log().in_flight_message().is_none());
}

#[test]
fn test_stale_ticket_events_are_dropped() {
    let mut state = ChatState::new();
    state.apply(ClientEvent::SessionsLoaded(Ok(vec![
        session("a", "First"),
        session("b", "Second"),
    ])));
    state.select_session("a");
    state.apply(ClientEvent::MessagesLoaded {
        session_id: "a".to_string(),
        result: Ok(Vec::new()),
    });
    let ticket = match state.send("hi").unwrap().remove(0) {
        Action::OpenStream { ticket, .. } => ticket,
        other => panic!("unexpected action {other:?}"),
    };

    state.select_session("b");
    state.apply(ClientEvent::MessagesLoaded {
        session_id: "b".to_string(),
        result: Ok(Vec::new()),
    });
    assert!(matches!(
        state.phase(),
        StreamPhase::Closed(StreamOutcome::Abandoned)
    ));

    state.apply(ClientEvent::StreamChunk {
        ticket: ticket.clone(),
        bytes: Bytes::from_static(b"data: {\"content\": \"late\"}\n"),
    });
    state.apply(ClientEvent::StreamEnded { ticket });
    assert!(state.messages().is_empty());
    assert!(matches!(
        state.phase(),
        StreamPhase::Closed(StreamOutcome::Abandoned)
    ));
}

#[tokio::test]
async fn test_delete_active_session_clears_view() {
    let backend = FakeBackend::new()
        .with_sessions(vec![session("a", "First"), session("b", "Second")])
        .with_messages("a", vec![Message::new("a", Role::User, "hello")]);
    let mut h = Harness::new(backend);
    h.dispatch(h.state.list_sessions());
    h.settle(|s| s.sessions().sessions().len() == 2).await;
    h.open("a").await;
    assert_eq!(h.state.messages().len(), 1);

    let actions = h.state.delete_session("a");
    h.dispatch(actions);
    h.settle(|s| s.sessions().sessions().len() == 1).await;

    assert_eq!(h.state.active_session_id(), None);
    assert!(h.state.messages().is_empty());
    assert_eq!(h.state.sessions().sessions()[0].id, "b");
}

#[tokio::test]
async fn test_failed_delete_keeps_state() {
    let backend = FakeBackend::new().with_sessions(vec![session("a", "First")]);
    backend.fail(FakeOp::DeleteSession);
    let mut h = Harness::new(backend);
    h.dispatch(h.state.list_sessions());
    h.settle(|s| !s.sessions().sessions().is_empty()).await;
    h.open("a").await;

    let actions = h.state.delete_session("a");
    h.dispatch(actions);
    h.settle(|s| s.latest_notice().is_some()).await;

    assert_eq!(h.state.latest_notice().unwrap().level, NoticeLevel::Error);
    assert_eq!(h.state.active_session_id(), Some("a"));
    assert_eq!(h.state.sessions().sessions().len(), 1);
}

#[tokio::test]
async fn test_failed_stream_shows_apology_and_unlocks_input() {
    let backend = FakeBackend::new()
        .with_sessions(vec![session("a", "First")])
        .with_stream(["data: {\"content\": \"Par\"}\n", "data: {\"content\": \"Partial\"}\n"])
        .with_stream_failure_after(1);
    let mut h = Harness::new(backend);
    h.open("a").await;

    let actions = h.state.send("hi").unwrap();
    h.dispatch(actions);
    h.settle(closed).await;

    assert!(matches!(
        h.state.phase(),
        StreamPhase::Closed(StreamOutcome::Failed)
    ));
    assert_eq!(h.state.messages()[1].content, STREAM_FAILURE_TEXT);
    assert_eq!(h.state.latest_notice().unwrap().level, NoticeLevel::Error);
    assert!(h.state.can_send());
}

#[tokio::test]
async fn test_failed_implicit_create_drops_pending_text() {
    let backend = FakeBackend::new();
    backend.fail(FakeOp::CreateSession);
    let mut h = Harness::new(backend);

    let actions = h.state.send("hello").unwrap();
    h.dispatch(actions);
    h.settle(|s| s.latest_notice().is_some()).await;

    assert!(h.state.can_send());
    assert!(h.state.messages().is_empty());
    assert!(h.backend().chat_requests().is_empty());
}
