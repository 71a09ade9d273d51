use reqwest::Client;
use serde::Serialize;

use crate::configs::Notify;
use crate::errors::AlertError;

use super::sink::AlertSink;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Sends alerts through the Telegram Bot API `sendMessage` method.
pub struct TelegramSink {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(notify: &Notify) -> Result<Self, AlertError> {
        let client = Client::builder().timeout(notify.timeout()).build()?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            notify.api_base.trim_end_matches('/'),
            notify.telegram_token.trim()
        );

        Ok(Self {
            client,
            endpoint,
            chat_id: notify.telegram_chat_id.trim().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AlertSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Rejected { status, body });
        }

        tracing::debug!("Telegram accepted alert for chat {}", self.chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;

    async fn spawn_api(status: StatusCode) -> (SocketAddr, mpsc::UnboundedReceiver<(String, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let app = Router::new()
            .route(
                "/:method_path/sendMessage",
                post(
                    move |State(tx): State<mpsc::UnboundedSender<(String, Value)>>,
                          Path(method_path): Path<String>,
                          Json(body): Json<Value>| async move {
                        let _ = tx.send((method_path, body));
                        (status, "{}")
                    },
                ),
            )
            .with_state(tx);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (address, rx)
    }

    fn notify(address: SocketAddr) -> Notify {
        Notify {
            cooldown_ms: 60000,
            telegram_token: "123:abc".to_string(),
            telegram_chat_id: "42".to_string(),
            api_base: format!("http://{address}/"),
            timeout_ms: 2000,
        }
    }

    #[tokio::test]
    async fn test_send_message() {
        let (address, mut rx) = spawn_api(StatusCode::OK).await;
        let sink = TelegramSink::new(&notify(address)).unwrap();

        sink.send("💧 *Pump* turned on.").await.unwrap();

        let (method_path, body) = rx.recv().await.unwrap();
        assert_eq!(method_path, "bot123:abc");
        assert_eq!(body["chat_id"], "42");
        assert_eq!(body["text"], "💧 *Pump* turned on.");
        assert_eq!(body["parse_mode"], "Markdown");
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let (address, _rx) = spawn_api(StatusCode::UNAUTHORIZED).await;
        let sink = TelegramSink::new(&notify(address)).unwrap();

        let error = sink.send("hello").await.unwrap_err();
        assert!(matches!(
            error,
            AlertError::Rejected { status, .. } if status == StatusCode::UNAUTHORIZED
        ));
    }
}
