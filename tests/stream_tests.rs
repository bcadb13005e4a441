//! Streaming client against a throwaway local HTTP responder, plus decoder
//! properties that must hold however the byte stream is chunked.

use ai_to_ai_chat::stream::{CompletionSource, SseDecoder, StreamingClient, StreamingClientConfig};
use ai_to_ai_chat::{
    ChatError, ChatMessage, Orchestrator, Participant, Participants, Session, NO_RESPONSE,
};
use proptest::prelude::*;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_test::{assert_err, assert_ok};

fn delta(text: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "choices": [{ "delta": { "content": text } }] })
    )
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Accept one request, hand its body back, and answer with `body` written in
/// `pieces` separate writes.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    pieces: Vec<String>,
) -> (String, oneshot::Receiver<String>) {
    serve(status, content_type, pieces, 0).await
}

/// Like [`serve_once`], but announces `missing` more body bytes than it
/// sends before closing the connection.
async fn serve(
    status: &'static str,
    content_type: &'static str,
    pieces: Vec<String>,
    missing: usize,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/chat", listener.local_addr().unwrap());
    let (body_tx, body_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let body_start = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = header_end(&buf) {
                break end;
            }
        };
        let head = String::from_utf8_lossy(&buf[..body_start]).to_string();
        let wanted = content_length(&head);
        while buf.len() < body_start + wanted {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let _ = body_tx.send(String::from_utf8_lossy(&buf[body_start..]).to_string());

        let total: usize = pieces.iter().map(String::len).sum::<usize>() + missing;
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status, content_type, total
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for piece in pieces {
            socket.write_all(piece.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let _ = socket.shutdown().await;
    });

    (url, body_rx)
}

fn client(url: &str) -> StreamingClient {
    StreamingClient::new(&StreamingClientConfig::new(url)).unwrap()
}

#[tokio::test]
async fn test_streams_cumulative_snapshots() {
    let body = format!("{}{}data: [DONE]\n", delta("Hel"), delta("lo"));
    let split = body.len() / 2;
    let (url, _) = serve_once(
        "200 OK",
        "text/event-stream",
        vec![body[..split].to_string(), body[split..].to_string()],
    )
    .await;

    let mut seen = Vec::new();
    let result = client(&url)
        .stream_completion("m", &[ChatMessage::user("hi")], &mut |s: &str| {
            seen.push(s.to_string())
        })
        .await;

    assert_eq!(assert_ok!(result), "Hello");
    assert_eq!(seen, vec!["Hel", "Hello"]);
}

#[tokio::test]
async fn test_request_body_carries_model_and_messages() {
    let (url, body_rx) =
        serve_once("200 OK", "text/event-stream", vec!["data: [DONE]\n".to_string()]).await;
    let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hello")];
    let result = client(&url)
        .stream_completion("openai/gpt-4o-mini", &messages, &mut |_: &str| {})
        .await;
    assert_ok!(result);

    let sent: serde_json::Value = serde_json::from_str(&body_rx.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "openai/gpt-4o-mini");
    assert_eq!(sent["messages"].as_array().unwrap().len(), 2);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["content"], "hello");
}

#[tokio::test]
async fn test_empty_stream_is_no_response() {
    let (url, _) = serve_once("200 OK", "text/event-stream", vec![String::new()]).await;
    let mut calls = 0;
    let result = client(&url)
        .stream_completion("m", &[], &mut |_: &str| calls += 1)
        .await;
    assert_eq!(assert_ok!(result), NO_RESPONSE);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_error_status_uses_server_message() {
    let (url, _) = serve_once(
        "429 Too Many Requests",
        "application/json",
        vec![r#"{"error":"rate limited"}"#.to_string()],
    )
    .await;
    let err = assert_err!(client(&url).stream_completion("m", &[], &mut |_: &str| {}).await);
    assert!(matches!(err, ChatError::RequestFailed { status: 429, .. }));
    assert_eq!(err.to_string(), "rate limited");
}

#[tokio::test]
async fn test_error_status_without_json_is_generic() {
    let (url, _) = serve_once(
        "500 Internal Server Error",
        "text/plain",
        vec!["oops".to_string()],
    )
    .await;
    let err = assert_err!(client(&url).stream_completion("m", &[], &mut |_: &str| {}).await);
    assert_eq!(err.to_string(), "Failed to send message");
}

#[tokio::test]
async fn test_truncated_body_is_unreadable_stream() {
    let (url, _) = serve("200 OK", "text/event-stream", vec![delta("partial")], 64).await;
    let mut seen = Vec::new();
    let err = assert_err!(
        client(&url)
            .stream_completion("m", &[], &mut |s: &str| seen.push(s.to_string()))
            .await
    );
    assert!(matches!(err, ChatError::UnreadableStream(_)), "got {:?}", err);
    assert!(seen.len() <= 1);
}

#[tokio::test]
async fn test_truncated_body_halts_session() {
    let (url, _) = serve("200 OK", "text/event-stream", vec![delta("partial")], 64).await;
    let session = Session::new(Participants::new(
        Participant::new("model-one", "#3b82f6"),
        Participant::new("model-two", "#22c55e"),
    ));
    let (events, _rx) = mpsc::unbounded_channel();
    let mut orch = Orchestrator::new(session, Arc::new(client(&url)), events);

    assert!(!orch.start_session().await);
    let s = orch.session();
    assert!(s.transcript().is_empty());
    assert!(!s.is_running());
    assert!(!s.is_loading());
    assert!(s
        .last_error()
        .is_some_and(|e| e.starts_with("Response body is not readable")));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/chat", listener.local_addr().unwrap());
    drop(listener);
    let err = assert_err!(client(&url).stream_completion("m", &[], &mut |_: &str| {}).await);
    assert!(matches!(err, ChatError::Transport(_)));
}

// -- Decoder properties ---------------------------------------------------

fn decode_in_pieces(body: &[u8], cuts: &[usize]) -> (Vec<String>, String) {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
    cuts.sort_unstable();
    let mut decoder = SseDecoder::new();
    let mut snapshots = Vec::new();
    let mut from = 0;
    for cut in cuts.into_iter().chain(std::iter::once(body.len())) {
        decoder.feed(&body[from..cut], &mut |s: &str| snapshots.push(s.to_string()));
        from = cut;
    }
    (snapshots, decoder.finish())
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_result(
        parts in prop::collection::vec("[a-z ]{1,8}", 1..8),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let mut body = String::new();
        for part in &parts {
            body.push_str(&delta(part));
        }
        body.push_str("data: [DONE]\n");

        let (whole_snapshots, whole) = decode_in_pieces(body.as_bytes(), &[]);
        let (split_snapshots, split) = decode_in_pieces(body.as_bytes(), &cuts);

        prop_assert_eq!(&whole, &parts.concat());
        prop_assert_eq!(&split, &whole);
        prop_assert_eq!(&split_snapshots, &whole_snapshots);
        for pair in split_snapshots.windows(2) {
            prop_assert!(pair[1].starts_with(&pair[0]));
            prop_assert!(pair[1].len() > pair[0].len());
        }
    }
}
