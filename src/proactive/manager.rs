use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    activity::{plan_for, ActivityEngine},
    db::Database,
    events::{EventBus, ProactiveMessage},
    feedback::{FeedbackTracker, GateReason},
    models::{Activity, Urgency},
    settings::ProactiveSettings,
};

use super::catalog::{self, StateChange};

/// Lowest autonomy level allowed to send non-critical messages unprompted.
pub const PROACTIVE_MIN_AUTONOMY: u8 = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    Autonomy {
        level: u8,
    },
    Gate {
        gate: GateReason,
        score: Option<f64>,
    },
    Cooldown {
        remaining_seconds: u64,
    },
    Suppressed {
        activity: Activity,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Sent { message: ProactiveMessage },
    Skipped { event_type: String, skip: SkipReason },
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent { .. })
    }

    pub fn message(&self) -> Option<&ProactiveMessage> {
        match self {
            NotifyOutcome::Sent { message } => Some(message),
            NotifyOutcome::Skipped { .. } => None,
        }
    }

    fn skipped(event_type: &str, skip: SkipReason) -> Self {
        debug!("Proactive [{event_type}] skipped: {skip:?}");
        NotifyOutcome::Skipped {
            event_type: event_type.to_string(),
            skip,
        }
    }
}

/// Decides whether a home event becomes a spoken or blinking message.
pub struct ProactiveManager {
    settings: ProactiveSettings,
    tracker: Arc<FeedbackTracker>,
    engine: Arc<ActivityEngine>,
    db: Option<Database>,
    bus: EventBus,
}

impl ProactiveManager {
    pub fn new(
        settings: ProactiveSettings,
        tracker: Arc<FeedbackTracker>,
        engine: Arc<ActivityEngine>,
        db: Option<Database>,
        bus: EventBus,
    ) -> Self {
        Self {
            settings,
            tracker,
            engine,
            db,
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Runs one event through the autonomy level, the gate, the cooldown and
    /// the delivery matrix.
    /// A sent message is tracked for feedback and published on the bus.
    pub async fn notify(&self, event_type: &str, urgency: Urgency, text: &str) -> NotifyOutcome {
        if !self.settings.enabled {
            return NotifyOutcome::skipped(event_type, SkipReason::Disabled);
        }

        if urgency != Urgency::Critical && self.settings.autonomy_level < PROACTIVE_MIN_AUTONOMY {
            return NotifyOutcome::skipped(
                event_type,
                SkipReason::Autonomy {
                    level: self.settings.autonomy_level,
                },
            );
        }

        let decision = self.tracker.should_notify(event_type, urgency).await;
        if !decision.allow {
            return NotifyOutcome::skipped(
                event_type,
                SkipReason::Gate {
                    gate: decision.reason,
                    score: decision.score,
                },
            );
        }

        if matches!(urgency, Urgency::Medium | Urgency::Low) {
            if let Some(remaining) = self.cooldown_remaining(event_type, decision.cooldown_seconds).await {
                return NotifyOutcome::skipped(
                    event_type,
                    SkipReason::Cooldown {
                        remaining_seconds: remaining,
                    },
                );
            }
        }

        let plan = plan_for(self.engine.detect().await, urgency);
        if plan.suppress {
            return NotifyOutcome::skipped(
                event_type,
                SkipReason::Suppressed {
                    activity: plan.activity,
                },
            );
        }

        let sent_at = Utc::now();
        let notification_id = Uuid::new_v4().to_string();
        self.tracker.track(&notification_id, event_type).await;

        if let Some(db) = &self.db {
            if let Err(err) = db.set_last_notification(event_type, sent_at, None).await {
                warn!("Failed to record send time for {event_type}: {err:#}");
            }
        }

        let text = if text.trim().is_empty() {
            catalog::describe(event_type)
        } else {
            text.to_string()
        };

        let message = ProactiveMessage {
            notification_id,
            event_type: event_type.to_string(),
            urgency,
            delivery: plan.delivery,
            activity: plan.activity,
            text,
            sent_at,
        };

        let receivers = self.bus.publish(message.clone());
        info!(
            "Proactive [{}/{}] via {} ({} receivers): {}",
            event_type, urgency, message.delivery, receivers, message.text
        );

        NotifyOutcome::Sent { message }
    }

    /// Like [`notify`](Self::notify), filling in urgency and text from the
    /// event catalog when the caller leaves them out.
    pub async fn notify_event(
        &self,
        event_type: &str,
        urgency: Option<Urgency>,
        text: Option<&str>,
    ) -> NotifyOutcome {
        let urgency = urgency.unwrap_or_else(|| catalog::default_urgency(event_type));
        self.notify(event_type, urgency, text.unwrap_or_default()).await
    }

    /// Maps an entity transition to an event and notifies it. `None` when the
    /// transition is not interesting.
    pub async fn handle_state_change(&self, change: &StateChange) -> Option<NotifyOutcome> {
        let event = catalog::map_state_change(change)?;
        Some(self.notify(event.event_type, event.urgency, &event.text()).await)
    }

    async fn cooldown_remaining(&self, event_type: &str, cooldown_seconds: u64) -> Option<u64> {
        let db = self.db.as_ref()?;
        let now = Utc::now();

        let last = match db.get_last_notification(event_type, now).await {
            Ok(last) => last?,
            Err(err) => {
                warn!("Failed to read send time for {event_type}: {err:#}");
                return None;
            }
        };

        let elapsed = (now - last).num_seconds().max(0) as u64;
        (elapsed < cooldown_seconds).then(|| cooldown_seconds - elapsed)
    }
}
