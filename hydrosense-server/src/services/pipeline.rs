use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use hydrosense_api::{RawReading, normalize};
use tokio::sync::{mpsc, oneshot};

use crate::errors::IngestError;
use crate::services::broadcaster::{Broadcaster, SubscriberId};
use crate::services::notifier::{Alert, Notifier};
use crate::services::state_store::StateStore;

/// Capacity of the channel feeding the pipeline task.
pub const EVENT_BUFFER: usize = 256;

/// Where a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Transport,
    Subscriber(SocketAddr),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Transport => f.write_str("transport"),
            Source::Subscriber(peer) => write!(f, "ws {peer}"),
        }
    }
}

#[derive(Debug)]
pub enum PipelineEvent {
    Line {
        source: Source,
        text: String,
    },
    Connect {
        id: SubscriberId,
        peer: SocketAddr,
        sender: mpsc::Sender<String>,
    },
    Disconnect {
        id: SubscriberId,
    },
}

/// Sequential owner of the state store, the subscriber set and the notifier.
///
/// Every line, from the transport or from a subscriber, goes through
/// [`Pipeline::ingest`] one at a time, so merges and alerts are never
/// interleaved.
pub struct Pipeline {
    store: StateStore,
    broadcaster: Broadcaster,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            store: StateStore::new(),
            broadcaster: Broadcaster::new(),
            notifier,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn ingest(
        &mut self,
        source: &Source,
        text: &str,
        now: Instant,
    ) -> Result<Vec<Alert>, IngestError> {
        let raw = RawReading::parse(text)?;
        let fragment = normalize(&raw);
        if !fragment.is_valid() {
            return Err(IngestError::NoRecognizedFields);
        }

        self.store.merge(&fragment);

        if let Some(snapshot) = self.store.snapshot() {
            let delivered = self.broadcaster.publish(snapshot);
            tracing::debug!("[{}] state broadcast to {} subscriber(s)", source, delivered);
        }

        Ok(self
            .notifier
            .notify(&self.store.previous().fields, &fragment, now))
    }

    pub fn handle(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Line { source, text } => {
                if let Err(e) = self.ingest(&source, &text, Instant::now()) {
                    tracing::warn!("[{}] Dropped payload {:?}: {}", source, preview(&text), e);
                }
            }
            PipelineEvent::Connect { id, peer, sender } => {
                self.broadcaster
                    .on_connect(id, sender, self.store.snapshot());
                tracing::info!(
                    "Subscriber {} connected from {} ({} total)",
                    id,
                    peer,
                    self.broadcaster.len()
                );
            }
            PipelineEvent::Disconnect { id } => {
                if self.broadcaster.on_disconnect(&id) {
                    tracing::info!(
                        "Subscriber {} disconnected ({} total)",
                        id,
                        self.broadcaster.len()
                    );
                }
            }
        }
    }

    /// Consume events until `stop` fires or every sender is gone, then close
    /// all subscriber connections.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PipelineEvent>,
        mut stop: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = &mut stop => break,
            }
        }

        tracing::info!("Pipeline stopping, closing {} subscriber(s)", self.broadcaster.len());
        self.broadcaster.close_all();
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(120) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
