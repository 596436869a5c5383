//! Integration tests for the Telegram client, sender, and polling loop.
//!
//! A scripted Bot API runs on an ephemeral port; `api_base` points the
//! client at it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use game_relay::config::TelegramConfig;
use game_relay::intake::IntakeHandler;
use game_relay::models::chat::{ChatTarget, OutgoingMessage};
use game_relay::queue::CommandQueue;
use game_relay::telegram::client::{ApiFailure, TelegramClient, TelegramService};
use game_relay::telegram::poller::spawn_update_loop;
use game_relay::telegram::ChatTransport;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::test_helpers::{test_config, OPERATOR_ID};

const TOKEN: &str = "test-token";
const CHAT: i64 = 555;

type Scripted = Mutex<VecDeque<(StatusCode, Value)>>;

/// Scripted Bot API. Unscripted calls succeed with an empty result.
#[derive(Default)]
struct MockBotApi {
    updates: Scripted,
    sends: Scripted,
    poll_bodies: Mutex<Vec<Value>>,
    send_bodies: Mutex<Vec<Value>>,
    stall_sends: AtomicBool,
}

impl MockBotApi {
    fn script_updates(&self, status: StatusCode, body: Value) {
        self.updates.lock().unwrap().push_back((status, body));
    }

    fn script_send(&self, status: StatusCode, body: Value) {
        self.sends.lock().unwrap().push_back((status, body));
    }

    fn poll_bodies(&self) -> Vec<Value> {
        self.poll_bodies.lock().unwrap().clone()
    }

    fn send_bodies(&self) -> Vec<Value> {
        self.send_bodies.lock().unwrap().clone()
    }
}

async fn mock_get_updates(
    State(api): State<Arc<MockBotApi>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    api.poll_bodies.lock().unwrap().push(body);
    let scripted = api.updates.lock().unwrap().pop_front();
    if let Some((status, body)) = scripted {
        return (status, Json(body));
    }
    // Short stand-in for a long poll that found nothing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (StatusCode::OK, Json(json!({ "ok": true, "result": [] })))
}

async fn mock_send_message(
    State(api): State<Arc<MockBotApi>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    api.send_bodies.lock().unwrap().push(body);
    if api.stall_sends.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    let scripted = api.sends.lock().unwrap().pop_front();
    let (status, body) = scripted
        .unwrap_or_else(|| (StatusCode::OK, json!({ "ok": true, "result": { "message_id": 1 } })));
    (status, Json(body))
}

/// Serve the mock and return it with a client config aimed at it.
async fn spawn_mock() -> (Arc<MockBotApi>, TelegramConfig) {
    let api = Arc::new(MockBotApi::default());
    let app = Router::new()
        .route(&format!("/bot{TOKEN}/getUpdates"), post(mock_get_updates))
        .route(&format!("/bot{TOKEN}/sendMessage"), post(mock_send_message))
        .with_state(Arc::clone(&api));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let mut telegram = test_config().telegram;
    telegram.api_base = format!("http://{addr}/");
    telegram.bot_token = TOKEN.into();
    (api, telegram)
}

fn message_update(update_id: i64, sender: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": { "id": sender, "is_bot": false, "first_name": "Op" },
            "chat": { "id": CHAT, "type": "private" },
            "date": 0,
            "text": text,
        }
    })
}

/// Poll `check` until it holds or five seconds pass.
async fn wait_until(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ── TelegramClient ───────────────────────────────────────────

#[tokio::test]
async fn send_now_sets_parse_mode_only_for_markdown() {
    let (api, telegram) = spawn_mock().await;
    let client = TelegramClient::new(&telegram).expect("client");

    client
        .send_now(&OutgoingMessage::markdown(CHAT, "*bold*"))
        .await
        .expect("markdown send");
    client
        .send_now(&OutgoingMessage::plain(ChatTarget::Username("@ops_channel".into()), "plain"))
        .await
        .expect("plain send");

    let bodies = api.send_bodies();
    assert_eq!(
        bodies[0],
        json!({ "chat_id": CHAT, "text": "*bold*", "parse_mode": "Markdown" })
    );
    assert_eq!(bodies[1], json!({ "chat_id": "@ops_channel", "text": "plain" }));
}

#[tokio::test]
async fn send_now_classifies_api_failures() {
    let (api, telegram) = spawn_mock().await;
    let client = TelegramClient::new(&telegram).expect("client");
    let message = OutgoingMessage::plain(CHAT, "x");

    api.script_send(
        StatusCode::BAD_REQUEST,
        json!({ "ok": false, "error_code": 400, "description": "Bad Request: chat not found" }),
    );
    let failure = client.send_now(&message).await.expect_err("bad request");
    assert!(
        matches!(&failure, ApiFailure::Permanent(detail) if detail.contains("chat not found")),
        "{failure}"
    );

    api.script_send(
        StatusCode::TOO_MANY_REQUESTS,
        json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 3",
            "parameters": { "retry_after": 3 }
        }),
    );
    let failure = client.send_now(&message).await.expect_err("flood control");
    assert!(
        matches!(
            &failure,
            ApiFailure::Transient {
                retry_after: Some(delay),
                ..
            } if *delay == Duration::from_secs(3)
        ),
        "{failure}"
    );

    api.script_send(
        StatusCode::BAD_GATEWAY,
        json!({ "ok": false, "error_code": 502, "description": "Bad Gateway" }),
    );
    let failure = client.send_now(&message).await.expect_err("server error");
    assert!(
        matches!(&failure, ApiFailure::Transient { retry_after: None, .. }),
        "{failure}"
    );
}

#[tokio::test]
async fn get_updates_sends_offset_and_timeout() {
    let (api, telegram) = spawn_mock().await;
    let client = TelegramClient::new(&telegram).expect("client");

    api.script_updates(
        StatusCode::OK,
        json!({ "ok": true, "result": [message_update(41, OPERATOR_ID, "/status")] }),
    );
    let updates = client.get_updates(41).await.expect("updates");

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].update_id, 41);
    assert_eq!(
        api.poll_bodies()[0],
        json!({ "offset": 41, "timeout": 1, "allowed_updates": ["message"] })
    );
}

// ── TelegramService ──────────────────────────────────────────

#[tokio::test]
async fn service_retries_flood_control_then_delivers() {
    let (api, telegram) = spawn_mock().await;
    let client = Arc::new(TelegramClient::new(&telegram).expect("client"));
    let (service, _worker) = TelegramService::start(client);

    api.script_send(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "ok": false, "error_code": 429, "parameters": { "retry_after": 0 } }),
    );
    service
        .send_message(OutgoingMessage::plain(CHAT, "eventually"))
        .await
        .expect("enqueue");

    wait_until(|| api.send_bodies().len() == 2).await;
    let bodies = api.send_bodies();
    assert!(bodies.iter().all(|b| b["text"] == "eventually"));
}

#[tokio::test]
async fn service_drops_permanent_failures_and_keeps_going() {
    let (api, telegram) = spawn_mock().await;
    let client = Arc::new(TelegramClient::new(&telegram).expect("client"));
    let (service, _worker) = TelegramService::start(client);

    api.script_send(
        StatusCode::BAD_REQUEST,
        json!({ "ok": false, "error_code": 400, "description": "can't parse entities" }),
    );
    service
        .send_message(OutgoingMessage::markdown(CHAT, "*broken"))
        .await
        .expect("enqueue");
    service
        .send_message(OutgoingMessage::plain(CHAT, "next"))
        .await
        .expect("enqueue");

    wait_until(|| api.send_bodies().len() == 2).await;
    let texts: Vec<Value> = api.send_bodies().into_iter().map(|b| b["text"].clone()).collect();
    assert_eq!(texts, [json!("*broken"), json!("next")]);
}

#[tokio::test]
async fn full_send_buffer_drops_instead_of_blocking() {
    let (api, telegram) = spawn_mock().await;
    api.stall_sends.store(true, Ordering::SeqCst);
    let client = Arc::new(TelegramClient::new(&telegram).expect("client"));
    let (service, _worker) = TelegramService::start_with_capacity(client, 1);

    service
        .send_message(OutgoingMessage::plain(CHAT, "first"))
        .await
        .expect("enqueue first");
    // The worker is now stuck delivering the first message.
    wait_until(|| api.send_bodies().len() == 1).await;

    service
        .send_message(OutgoingMessage::plain(CHAT, "second"))
        .await
        .expect("second fits the buffer");

    let third = tokio::time::timeout(
        Duration::from_secs(1),
        service.send_message(OutgoingMessage::plain(CHAT, "third")),
    )
    .await
    .expect("enqueue returns without waiting");
    let err = third.expect_err("buffer is full");
    assert!(err.to_string().contains("buffer full"), "{err}");
}

// ── Polling loop ─────────────────────────────────────────────

#[tokio::test]
async fn update_loop_feeds_intake_and_advances_offset() {
    let (api, telegram) = spawn_mock().await;
    let client = Arc::new(TelegramClient::new(&telegram).expect("client"));
    let (service, _worker) = TelegramService::start(Arc::clone(&client));

    let queue = Arc::new(CommandQueue::new());
    let intake = Arc::new(IntakeHandler::new(
        Arc::new(test_config()),
        Arc::clone(&queue),
    ));

    api.script_updates(
        StatusCode::OK,
        json!({ "ok": true, "result": [
            message_update(7, OPERATOR_ID, "/speed 50"),
            message_update(8, OPERATOR_ID + 1, "/shutdown"),
            message_update(9, OPERATOR_ID, "just chatting"),
        ]}),
    );

    let ct = CancellationToken::new();
    let poller = spawn_update_loop(client, intake, Arc::new(service), ct.clone());

    wait_until(|| api.send_bodies().len() == 2).await;
    wait_until(|| api.poll_bodies().iter().any(|b| b["offset"] == 10)).await;

    let replies: Vec<String> = api
        .send_bodies()
        .iter()
        .map(|b| b["text"].as_str().expect("text").to_owned())
        .collect();
    assert!(replies[0].contains("50"), "{replies:?}");
    assert!(replies[1].contains("not allowed"), "{replies:?}");

    let commands = queue.drain_all();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].origin_channel, CHAT);

    ct.cancel();
    tokio::time::timeout(Duration::from_secs(5), poller)
        .await
        .expect("poller stops after cancel")
        .expect("poller task");
}

#[tokio::test]
async fn update_loop_honours_retry_after_on_poll_failure() {
    let (api, telegram) = spawn_mock().await;
    let client = Arc::new(TelegramClient::new(&telegram).expect("client"));
    let (service, _worker) = TelegramService::start(Arc::clone(&client));
    let queue = Arc::new(CommandQueue::new());
    let intake = Arc::new(IntakeHandler::new(
        Arc::new(test_config()),
        Arc::clone(&queue),
    ));

    api.script_updates(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "ok": false, "error_code": 429, "parameters": { "retry_after": 0 } }),
    );
    api.script_updates(
        StatusCode::OK,
        json!({ "ok": true, "result": [message_update(1, OPERATOR_ID, "/players")] }),
    );

    let ct = CancellationToken::new();
    let poller = spawn_update_loop(client, intake, Arc::new(service), ct.clone());

    wait_until(|| queue.len() == 1).await;

    ct.cancel();
    tokio::time::timeout(Duration::from_secs(5), poller)
        .await
        .expect("poller stops after cancel")
        .expect("poller task");
}
