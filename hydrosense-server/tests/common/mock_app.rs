use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use futures::StreamExt;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use hydrosense_server::configs::{Settings, TransportKind};
use hydrosense_server::errors::ServerError;
use hydrosense_server::serve;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const WAIT: Duration = Duration::from_secs(2);

pub struct MockApp {
    pub address: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_settings(Self::settings()).await
    }

    /// Defaults without a transport, so readings only come from subscribers.
    pub fn settings() -> Settings {
        let mut settings = Settings::build("test", Vec::new()).unwrap();
        settings.server.host = String::from("127.0.0.1");
        settings.transport.kind = TransportKind::None;
        settings.notify.telegram_token = String::new();
        settings.notify.telegram_chat_id = String::new();
        settings
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            serve(listener, &settings, async move {
                let _ = stopped.await;
            })
            .await
        });

        Self {
            address,
            stop: Some(stop),
            handle,
        }
    }

    pub async fn connect(&self, path: &str) -> Client {
        let (client, _) = connect_async(format!("ws://{}{}", self.address, path))
            .await
            .unwrap();
        client
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(WAIT, self.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

/// Next text frame as JSON, failing after [`WAIT`].
pub async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("Connection ended")
            .unwrap();

        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Stand-in for the Telegram Bot API recording every `sendMessage` body.
pub struct MockTelegram {
    pub base: String,
    pub requests: mpsc::UnboundedReceiver<Value>,
}

impl MockTelegram {
    pub async fn new() -> Self {
        let (tx, requests) = mpsc::unbounded_channel();

        let app = Router::new()
            .route(
                "/:bot/sendMessage",
                post(
                    |State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                        let _ = tx.send(body);
                        Json(serde_json::json!({ "ok": true }))
                    },
                ),
            )
            .with_state(tx);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{address}"),
            requests,
        }
    }
}
