use std::net::SocketAddr;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::services::{PipelineEvent, SUBSCRIBER_BUFFER, Source};

#[derive(Clone)]
pub struct SubscriberState {
    pub events: mpsc::Sender<PipelineEvent>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<SubscriberState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_subscriber(socket, peer, state))
}

async fn handle_subscriber(socket: WebSocket, peer: SocketAddr, state: SubscriberState) {
    let id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (client_tx, mut client_rx) = mpsc::channel::<String>(SUBSCRIBER_BUFFER);

    let connect = PipelineEvent::Connect {
        id,
        peer,
        sender: client_tx,
    };
    if state.events.send(connect).await.is_err() {
        tracing::warn!("Pipeline is gone, refusing subscriber {}", peer);
        let _ = sender.send(WsMessage::Close(None)).await;
        return;
    }

    // Ends when the pipeline drops this subscriber or the socket fails.
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = client_rx.recv().await {
            if sender.send(WsMessage::Text(text)).await.is_err() {
                return;
            }
        }
        let _ = sender.send(WsMessage::Close(None)).await;
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            message = receiver.next() => match message {
                Some(Ok(WsMessage::Text(text))) => forward(&state, peer, &text).await,
                Some(Ok(WsMessage::Binary(bytes))) => {
                    forward(&state, peer, &String::from_utf8_lossy(&bytes)).await
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error for subscriber {}: {}", peer, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    send_task.abort();
    let _ = state.events.send(PipelineEvent::Disconnect { id }).await;
}

async fn forward(state: &SubscriberState, peer: SocketAddr, text: &str) {
    let line = text.trim();
    if line.is_empty() {
        return;
    }

    tracing::debug!("[ws {}] raw: {}", peer, line);

    let event = PipelineEvent::Line {
        source: Source::Subscriber(peer),
        text: line.to_string(),
    };
    if state.events.send(event).await.is_err() {
        tracing::warn!("Pipeline is gone, dropped line from {}", peer);
    }
}
