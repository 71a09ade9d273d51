use std::collections::HashMap;

use hydrosense_api::CanonicalState;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type SubscriberId = Uuid;

/// Snapshots queued per subscriber before it counts as stalled.
pub const SUBSCRIBER_BUFFER: usize = 32;

/// Fan-out of serialized state snapshots to connected subscribers.
///
/// A subscriber whose queue is full or closed is dropped, which ends its
/// connection; the others are unaffected.
#[derive(Default)]
pub struct Broadcaster {
    subscribers: HashMap<SubscriberId, mpsc::Sender<String>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Seed the subscriber with `seed` when there is one, then register it.
    pub fn on_connect(
        &mut self,
        id: SubscriberId,
        sender: mpsc::Sender<String>,
        seed: Option<&CanonicalState>,
    ) {
        if let Some(state) = seed {
            match serde_json::to_string(state) {
                Ok(message) => {
                    if sender.try_send(message).is_err() {
                        tracing::warn!("Subscriber {} left before seeding", id);
                        return;
                    }
                }
                Err(e) => tracing::error!("Failed to serialize state: {}", e),
            }
        }

        self.subscribers.insert(id, sender);
    }

    pub fn on_disconnect(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Send the snapshot to every subscriber; returns the number of deliveries.
    pub fn publish(&mut self, snapshot: &CanonicalState) -> usize {
        let message = match serde_json::to_string(snapshot) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("Failed to serialize state: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        self.subscribers.retain(|id, sender| match sender.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Subscriber {} is not keeping up, dropping it", id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Failed to send state to subscriber {}", id);
                false
            }
        });

        delivered
    }

    /// Drop every subscriber channel, which closes their connections.
    pub fn close_all(&mut self) {
        self.subscribers.clear();
    }
}
