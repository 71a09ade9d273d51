use std::time::Duration;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;

use crate::common::mock_app::{MockApp, MockTelegram, WAIT, next_json};

mod common;

#[tokio::test]
async fn test_pump_transition_sends_one_alert() {
    let mut telegram = MockTelegram::new().await;

    let mut settings = MockApp::settings();
    settings.notify.telegram_token = String::from("123:abc");
    settings.notify.telegram_chat_id = String::from("42");
    settings.notify.api_base = telegram.base.clone();
    settings.notify.cooldown_ms = 60_000;

    let app = MockApp::with_settings(settings).await;
    let mut client = app.connect("/ws").await;

    for line in [r#"{"relay":0}"#, r#"{"relay":1}"#, r#"{"relay":0}"#] {
        client.send(Message::text(line)).await.unwrap();
        next_json(&mut client).await;
    }

    let body = tokio::time::timeout(WAIT, telegram.requests.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["chat_id"], "42");
    assert_eq!(body["parse_mode"], "Markdown");
    assert!(body["text"].as_str().unwrap().contains("turned on"));

    let suppressed = tokio::time::timeout(Duration::from_millis(300), telegram.requests.recv()).await;
    assert!(suppressed.is_err());

    app.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_telegram_does_not_stall_ingestion() {
    let mut settings = MockApp::settings();
    settings.notify.telegram_token = String::from("123:abc");
    settings.notify.telegram_chat_id = String::from("42");
    settings.notify.api_base = String::from("http://127.0.0.1:9");
    settings.notify.timeout_ms = 500;

    let app = MockApp::with_settings(settings).await;
    let mut client = app.connect("/").await;

    for (line, distance) in [(r#"{"distance":5}"#, 5.0), (r#"{"distance":19.5}"#, 19.5), (r#"{"distance":4}"#, 4.0)] {
        client.send(Message::text(line)).await.unwrap();
        assert_eq!(next_json(&mut client).await["distance"], distance);
    }

    app.shutdown().await;
}
