//! Event-source transport tests against a wiremock server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentj_stream::adapters::ReqwestHttpClient;
use agentj_stream::config::StreamConfig;
use agentj_stream::error::StreamError;
use agentj_stream::event_source::{EventSourceAdapter, EventSourceCallbacks};
use agentj_stream::session::StreamSession;
use agentj_stream::sse::Message;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default, Clone)]
struct Seen {
    messages: Arc<Mutex<Vec<Message>>>,
    parse_errors: Arc<Mutex<usize>>,
    opened: Arc<Mutex<usize>>,
}

impl Seen {
    fn callbacks(&self) -> EventSourceCallbacks {
        let messages = Arc::clone(&self.messages);
        let parse_errors = Arc::clone(&self.parse_errors);
        let opened = Arc::clone(&self.opened);
        EventSourceCallbacks::new(move |m| messages.lock().unwrap().push(m))
            .on_parse_error(move |_| *parse_errors.lock().unwrap() += 1)
            .on_open(move || *opened.lock().unwrap() += 1)
    }
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn test_events_delivered_through_shared_parser() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("Authorization", "Bearer es-token"))
        .respond_with(event_stream(
            "event: update\nid: 1\ndata: {\"planId\":\"p-1\"}\n\ndata: oops\n\ndata: {\"n\":2}\n\n",
        ))
        .mount(&server)
        .await;

    let config = StreamConfig::default().with_auth_token("es-token");
    let seen = Seen::default();
    let handle = EventSourceAdapter::new(config)
        .open(&format!("{}/events", server.uri()), seen.callbacks(), None)
        .expect("valid url");

    tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("stream should end with the response body");

    let messages = seen.messages.lock().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].event.as_deref(), Some("update"));
    assert_eq!(messages[0].id.as_deref(), Some("1"));
    assert_eq!(messages[0].json(), Some(&json!({"planId": "p-1"})));
    assert_eq!(messages[1].raw_text(), Some("oops"));
    assert_eq!(messages[2].json(), Some(&json!({"n": 2})));
    assert_eq!(*seen.parse_errors.lock().unwrap(), 1);
    assert_eq!(*seen.opened.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(event_stream("data: 1\n\n").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let seen = Seen::default();
    let handle = EventSourceAdapter::default()
        .open(&format!("{}/slow", server.uri()), seen.callbacks(), None)
        .expect("valid url");

    handle.close();
    handle.close();

    tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("close should end the connection promptly");

    assert!(seen.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_abort_signal_closes_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(event_stream("data: 1\n\n").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let signal = CancellationToken::new();
    let handle = EventSourceAdapter::default()
        .open(
            &format!("{}/slow", server.uri()),
            EventSourceCallbacks::new(|_| {}),
            Some(signal.clone()),
        )
        .expect("valid url");
    assert!(!handle.is_closed());

    signal.cancel();
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(closed.is_ok(), "connection should be released after abort");
}

#[tokio::test]
async fn test_connection_failure_reported_once_without_reconnect() {
    let errors = Arc::new(Mutex::new(Vec::<StreamError>::new()));
    let sink = Arc::clone(&errors);

    let handle = EventSourceAdapter::new(StreamConfig::default())
        .open(
            "http://127.0.0.1:59997/events",
            EventSourceCallbacks::new(|_| {}).on_error(move |e| sink.lock().unwrap().push(e)),
            None,
        )
        .expect("valid url");

    tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("failed connection should end the driver");

    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_and_post_produce_identical_messages() {
    let body = concat!(
        "data: line1\ndata:\n\n",
        "event: update\ndata: {\"a\":1}\ndata: {\"b\":2}\n\n",
        "data:  padded\n\n",
        ": keep-alive\ndata: {\"n\":3}\n\n",
    );

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;
    let url = format!("{}/stream", server.uri());

    let mut rx = StreamSession::new(Arc::new(ReqwestHttpClient::new()), StreamConfig::default())
        .messages(&url, &json!({}), None);
    let mut posted = Vec::new();
    while let Some(item) = rx.recv().await {
        posted.push(item.expect("post stream should not fail"));
    }

    let seen = Seen::default();
    let handle = EventSourceAdapter::default()
        .open(&url, seen.callbacks(), None)
        .expect("valid url");
    tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("stream should end with the response body");

    assert_eq!(posted.len(), 4);
    assert_eq!(posted[0].raw_text(), Some("line1\n"));
    assert_eq!(*seen.messages.lock().unwrap(), posted);
}
