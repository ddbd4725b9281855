//! Integration tests: serve the webhook router on a free loopback port and drive it over HTTP.
//! A mock Bot API (axum on another port) records sendMessage calls. No network access needed.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, http::Uri, Json, Router};
use psyche::channels::{ChatId, Notifier, TelegramChannel};
use psyche::classify::{ANALYSIS_STARTED_TEXT, FORMAT_ERROR_TEXT, WELCOME_TEXT};
use psyche::config::BotToken;
use psyche::error::WebhookError;
use psyche::gateway::{self, GatewayState, SECRET_HEADER, WEBHOOK_PATH};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const TOKEN: &str = "123:test-token";

#[derive(Clone)]
struct MockApi {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    status: StatusCode,
}

async fn record_call(
    State(api): State<MockApi>,
    uri: Uri,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    api.calls
        .lock()
        .unwrap()
        .push((uri.path().to_string(), body));
    let ok = api.status.is_success();
    (api.status, Json(json!({ "ok": ok, "result": true })))
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Starts a mock Bot API and a webhook server wired to it. Returns (webhook url, mock).
async fn start(status: StatusCode, secret: Option<&str>) -> (String, MockApi) {
    let api = MockApi {
        calls: Arc::new(Mutex::new(Vec::new())),
        status,
    };
    let api_base = spawn(Router::new().fallback(record_call).with_state(api.clone())).await;
    let channel = TelegramChannel::new(api_base, BotToken::parse(TOKEN).unwrap());
    let state = GatewayState {
        port: 0,
        webhook_secret: secret.map(str::to_string),
        notifier: Arc::new(channel),
    };
    let base = spawn(gateway::router(state)).await;
    (format!("{}{}", base, WEBHOOK_PATH), api)
}

async fn post(url: &str, body: &'static str) -> (StatusCode, String) {
    let resp = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("webhook request");
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    (status, resp.text().await.unwrap())
}

#[tokio::test]
async fn start_command_end_to_end() {
    let (url, api) = start(StatusCode::OK, None).await;
    let (status, body) = post(&url, r#"{"message":{"text":"/start","chat":{"id":42}}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let calls = api.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, format!("/bot{}/sendMessage", TOKEN));
    assert_eq!(
        calls[0].1,
        json!({ "chat_id": 42, "text": WELCOME_TEXT, "parse_mode": "Markdown" })
    );
}

#[tokio::test]
async fn each_update_is_classified_on_its_own() {
    let (url, api) = start(StatusCode::OK, None).await;
    post(&url, r#"{"message":{"text":"20.05.1997","chat":{"id":5}}}"#).await;
    post(&url, r#"{"message":{"text":"Мария","chat":{"id":5}}}"#).await;
    post(&url, r#"{"message":{"text":"123abc","chat":{"id":5}}}"#).await;
    post(&url, r#"{"message":{"chat":{"id":5}}}"#).await;

    let texts: Vec<Value> = api
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|(_, body)| body["text"].clone())
        .collect();
    assert_eq!(
        texts,
        vec![
            json!("Спасибо дата принята: 20.05.1997\nВведите имя"),
            json!(ANALYSIS_STARTED_TEXT),
            json!(FORMAT_ERROR_TEXT),
            json!(FORMAT_ERROR_TEXT),
        ]
    );
}

#[tokio::test]
async fn update_without_message_is_acknowledged_silently() {
    let (url, api) = start(StatusCode::OK, None).await;
    let (status, body) = post(&url, r#"{"update_id":1,"edited_message":{"text":"x"}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert!(api.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_gets_generic_error() {
    let (url, api) = start(StatusCode::OK, None).await;
    let (status, body) = post(&url, "\u{1}not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error");
    assert!(api.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delivery_failure_still_acknowledges() {
    let (url, api) = start(StatusCode::INTERNAL_SERVER_ERROR, None).await;
    let (status, body) = post(&url, r#"{"message":{"text":"/start","chat":{"id":42}}}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(api.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn secret_token_is_enforced_when_configured() {
    let (url, api) = start(StatusCode::OK, Some("s3cret")).await;
    let update = r#"{"message":{"text":"/start","chat":{"id":1}}}"#;

    let (status, _) = post(&url, update).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let resp = reqwest::Client::new()
        .post(&url)
        .header(SECRET_HEADER, "s3cret")
        .body(update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(api.calls.lock().unwrap().len(), 1);
}

struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
    async fn send_message(&self, _chat_id: &ChatId, _text: &str) -> Result<(), WebhookError> {
        panic!("notifier blew up");
    }
}

#[tokio::test]
async fn panic_while_handling_gets_generic_error() {
    let state = GatewayState {
        port: 0,
        webhook_secret: None,
        notifier: Arc::new(PanickingNotifier),
    };
    let url = format!("{}{}", spawn(gateway::router(state)).await, WEBHOOK_PATH);

    let (status, body) = post(&url, r#"{"message":{"text":"/start","chat":{"id":1}}}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error");

    // The server keeps answering after a panicked request.
    let (status, body) = post(&url, r#"{"update_id":2}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn health_probe_responds() {
    let (url, _api) = start(StatusCode::OK, None).await;
    let base = url.trim_end_matches(WEBHOOK_PATH);
    let json: Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["runtime"], "running");
}
