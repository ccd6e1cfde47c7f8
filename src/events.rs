use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{Activity, DeliveryMethod, Urgency};

const DEFAULT_CAPACITY: usize = 256;

/// A proactive message that passed the gate and the delivery matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProactiveMessage {
    pub notification_id: String,
    pub event_type: String,
    pub urgency: Urgency,
    pub delivery: DeliveryMethod,
    pub activity: Activity,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Fan-out channel for outgoing proactive messages.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ProactiveMessage>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes without waiting for anyone; returns how many subscribers saw
    /// the message. Zero subscribers is a normal condition.
    pub fn publish(&self, message: ProactiveMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProactiveMessage> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
