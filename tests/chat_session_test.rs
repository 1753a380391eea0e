//! End-to-end session tests against a mock completion endpoint.

use personachat::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn delta_frame(text: &str) -> String {
    format!(r#"data: {{"choices":[{{"delta":{{"content":"{text}"}}}}]}}"#)
}

fn sse_body(deltas: &[&str], done: bool) -> String {
    let mut body = String::new();
    for delta in deltas {
        body.push_str(&delta_frame(delta));
        body.push('\n');
    }
    if done {
        body.push_str("data: [DONE]\n");
    }
    body
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn mount_completions(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/chat/completions"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn streamed_reply_lands_in_the_transcript() {
    let server = MockServer::start().await;
    mount_completions(&server, sse_response(sse_body(&["안", "녕"], true))).await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    session.submit("안녕").await.unwrap();

    assert_eq!(session.state(), SessionState::Succeeded);
    assert!(session.last_error().is_none());

    let visible = session.transcript().visible_turns();
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0], ChatMessage::user("안녕"));
    assert_eq!(visible[1], ChatMessage::assistant("안녕"));
}

#[tokio::test]
async fn request_payload_carries_system_prompt_model_and_stream_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-oss-120b",
            "stream": true,
            "messages": [
                {"role": "system", "content": "You are a pirate."},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(sse_response(sse_body(&["arr"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "You are a pirate."));
    session.submit("hello").await.unwrap();
    assert_eq!(
        session.transcript().visible_turns()[1],
        ChatMessage::assistant("arr")
    );
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(sse_response(sse_body(&["ok"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let config = SessionConfig::new(server.uri(), "prompt")
        .with_api_key("sk-test")
        .with_credential_required(true);
    let mut session = ChatSession::new(config);
    session.submit("hi").await.unwrap();
    assert_eq!(session.state(), SessionState::Succeeded);
}

#[tokio::test]
async fn http_error_rolls_back_the_placeholder() {
    let server = MockServer::start().await;
    mount_completions(
        &server,
        ResponseTemplate::new(401).set_body_string("invalid key"),
    )
    .await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    let err = session.submit("hello").await.unwrap_err();

    assert_eq!(
        err,
        ChatError::Transport {
            status: 401,
            body: "invalid key".to_string()
        }
    );
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.last_error().unwrap().to_string().contains("401"));

    // Only the user turn remains.
    let visible = session.transcript().visible_turns();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0], ChatMessage::user("hello"));
}

#[tokio::test]
async fn success_response_without_event_stream_body_is_a_transport_error() {
    let server = MockServer::start().await;
    mount_completions(
        &server,
        ResponseTemplate::new(200).set_body_string("plain text"),
    )
    .await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    let err = session.submit("hello").await.unwrap_err();

    assert_eq!(
        err,
        ChatError::Transport {
            status: 200,
            body: "plain text".to_string()
        }
    );
    assert_eq!(session.transcript().visible_turns().len(), 1);
}

#[tokio::test]
async fn stream_without_sentinel_still_completes() {
    let server = MockServer::start().await;
    mount_completions(&server, sse_response(sse_body(&["a", "b"], false))).await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    session.submit("hi").await.unwrap();

    assert_eq!(session.state(), SessionState::Succeeded);
    assert_eq!(
        session.transcript().visible_turns()[1],
        ChatMessage::assistant("ab")
    );
}

#[tokio::test]
async fn malformed_frames_and_comments_do_not_abort_the_stream() {
    let server = MockServer::start().await;
    let body = format!(
        ": keep-alive\n{}\ndata: {{\"choices\":[\n\n{}\ndata: [DONE]\n",
        delta_frame("A"),
        delta_frame("B")
    );
    mount_completions(&server, sse_response(body)).await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    session.submit("hi").await.unwrap();
    assert_eq!(
        session.transcript().visible_turns()[1],
        ChatMessage::assistant("AB")
    );
}

#[tokio::test]
async fn error_slot_clears_on_next_accepted_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_completions(&server, sse_response(sse_body(&["fine"], true))).await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    assert!(session.submit("first").await.is_err());
    assert!(session.last_error().is_some());

    session.submit("second").await.unwrap();
    assert!(session.last_error().is_none());
    assert_eq!(session.state(), SessionState::Succeeded);

    // Failed attempt left its user turn; the retry appended another pair.
    let visible = session.transcript().visible_turns();
    assert_eq!(visible.len(), 3);
    assert_eq!(visible[2], ChatMessage::assistant("fine"));
}

#[tokio::test]
async fn follow_up_requests_replay_the_full_history() {
    let server = MockServer::start().await;
    mount_completions(&server, sse_response(sse_body(&["reply"], true))).await;

    let mut session = ChatSession::new(SessionConfig::new(server.uri(), "prompt"));
    session.submit("one").await.unwrap();
    session.submit("two").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = second["messages"].as_array().unwrap();
    let roles: Vec<&str> = messages
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["system", "user", "assistant", "user"]);
    assert_eq!(messages[2]["content"], "reply");
    assert_eq!(messages[3]["content"], "two");
}

#[tokio::test]
async fn missing_credential_never_reaches_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse_response(sse_body(&["never"], true)))
        .expect(0)
        .mount(&server)
        .await;

    let config = SessionConfig::new(server.uri(), "prompt").with_credential_required(true);
    let mut session = ChatSession::new(config);
    let err = session.submit("hello").await.unwrap_err();
    assert!(matches!(err, ChatError::Configuration(_)));
    assert_eq!(session.state(), SessionState::Failed);

    // The transcript is untouched, unlike transport failures which keep the
    // user turn.
    assert!(session.transcript().visible_turns().is_empty());
}
