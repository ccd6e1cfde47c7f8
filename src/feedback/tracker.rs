use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    db::{Database, FeedbackEntry, FeedbackKind, DEFAULT_SCORE},
    error::FeedbackError,
    models::Urgency,
    settings::FeedbackSettings,
};

use super::{
    policy::{self, NotifyDecision},
    sweep::SweepController,
};

/// Counter bumped once per dispatched notification.
pub const TOTAL_SENT: &str = "total_sent";

const STATS_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub auto_timeout: Duration,
    pub base_cooldown_seconds: u64,
    pub sweep_interval: Duration,
    pub strict_ids: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from(&FeedbackSettings::default())
    }
}

impl From<&FeedbackSettings> for TrackerConfig {
    fn from(settings: &FeedbackSettings) -> Self {
        Self {
            auto_timeout: settings.auto_timeout(),
            base_cooldown_seconds: settings.base_cooldown_seconds,
            sweep_interval: settings.sweep_interval(),
            strict_ids: settings.strict_ids,
        }
    }
}

/// A dispatched notification still waiting for a reaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingNotification {
    pub id: String,
    pub event_type: String,
    pub sent_at: DateTime<Utc>,
    #[serde(skip)]
    pub sent_instant: Instant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    pub event_type: String,
    pub kind: FeedbackKind,
    pub delta: f64,
    pub new_score: f64,
    /// False when storage was unavailable and the score fell back to default.
    pub persisted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub score: f64,
    pub cooldown_seconds: u64,
    pub counters: BTreeMap<String, u64>,
    pub recent_feedback: Vec<FeedbackEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOverview {
    pub storage_available: bool,
    pub event_types: BTreeMap<String, EventStats>,
    pub total_types: usize,
    pub pending_notifications: usize,
}

/// Learns from reactions to proactive messages.
///
/// Holds the pending-notification registry in memory and delegates scores,
/// ledger and counters to the database. Without a database (or when it
/// fails) every read degrades to defaults: score 0.5, empty ledger, no
/// counters.
pub struct FeedbackTracker {
    db: Option<Database>,
    config: TrackerConfig,
    pending: Mutex<HashMap<String, PendingNotification>>,
    sweep: Mutex<SweepController>,
}

impl FeedbackTracker {
    pub fn new(config: TrackerConfig, db: Option<Database>) -> Self {
        Self {
            db,
            config,
            pending: Mutex::new(HashMap::new()),
            sweep: Mutex::new(SweepController::new()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Starts the auto-timeout sweep.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.sweep
            .lock()
            .await
            .start(Arc::clone(self), self.config.sweep_interval)?;
        info!("FeedbackTracker initialized");
        Ok(())
    }

    /// Stops the sweep and waits for it to finish its current tick.
    pub async fn stop(&self) -> Result<()> {
        self.sweep.lock().await.stop().await
    }

    pub async fn is_sweeping(&self) -> bool {
        self.sweep.lock().await.is_running()
    }

    // ----- notification tracking -----

    /// Registers a dispatched notification. Reusing a live id replaces the
    /// earlier entry.
    pub async fn track(&self, notification_id: &str, event_type: &str) {
        let entry = PendingNotification {
            id: notification_id.to_string(),
            event_type: event_type.to_string(),
            sent_at: Utc::now(),
            sent_instant: Instant::now(),
        };

        let previous = self
            .pending
            .lock()
            .await
            .insert(notification_id.to_string(), entry);
        if let Some(previous) = previous {
            warn!(
                "Notification id {} was already pending (type {}); replacing it",
                notification_id, previous.event_type
            );
        }

        if let Some(db) = &self.db {
            if let Err(err) = db.increment_counter(event_type, TOTAL_SENT).await {
                warn!("Failed to count dispatch of {event_type}: {err:#}");
            }
        }

        debug!("Notification tracked: {notification_id} (type: {event_type})");
    }

    /// Parses `kind` and resolves the notification. An unrecognised kind is
    /// rejected before any state changes.
    pub async fn record_feedback(
        &self,
        notification_id: &str,
        kind: &str,
    ) -> Result<FeedbackOutcome, FeedbackError> {
        let kind = kind.parse::<FeedbackKind>()?;
        self.resolve(notification_id, kind).await
    }

    /// Resolves a pending notification with explicit feedback.
    ///
    /// Callers that never tracked a notification may pass the event type in
    /// place of the id; an unknown id is therefore reinterpreted as an event
    /// type unless `strict_ids` is configured.
    pub async fn resolve(
        &self,
        notification_id: &str,
        kind: FeedbackKind,
    ) -> Result<FeedbackOutcome, FeedbackError> {
        let tracked = self.pending.lock().await.remove(notification_id);

        let event_type = match tracked {
            Some(pending) => pending.event_type,
            None if self.config.strict_ids || notification_id.trim().is_empty() => {
                return Err(FeedbackError::UnknownNotification {
                    id: notification_id.to_string(),
                });
            }
            None => {
                debug!("No pending notification {notification_id}; treating it as an event type");
                notification_id.to_string()
            }
        };

        Ok(self.apply(&event_type, kind).await)
    }

    async fn apply(&self, event_type: &str, kind: FeedbackKind) -> FeedbackOutcome {
        let delta = kind.delta();
        let (new_score, persisted) = match &self.db {
            Some(db) => match db.apply_feedback(event_type, kind, Utc::now()).await {
                Ok(score) => (score, true),
                Err(err) => {
                    warn!("Failed to persist {kind} feedback for {event_type}: {err:#}");
                    (DEFAULT_SCORE, false)
                }
            },
            None => (DEFAULT_SCORE, false),
        };

        info!(
            "Feedback [{}] for '{}': {:+.2} -> score {:.2}",
            kind, event_type, delta, new_score
        );

        FeedbackOutcome {
            event_type: event_type.to_string(),
            kind,
            delta,
            new_score,
            persisted,
        }
    }

    /// Records every pending notification older than the auto-timeout as
    /// `ignored`. Entries leave the registry before their feedback is written,
    /// so a notification is never resolved twice.
    pub async fn expire_stale(&self, now: Instant) -> SweepReport {
        let expired: Vec<PendingNotification> = {
            let mut pending = self.pending.lock().await;
            let stale_ids: Vec<String> = pending
                .values()
                .filter(|entry| {
                    now.saturating_duration_since(entry.sent_instant) > self.config.auto_timeout
                })
                .map(|entry| entry.id.clone())
                .collect();
            stale_ids
                .iter()
                .filter_map(|id| pending.remove(id))
                .collect()
        };

        let mut report = SweepReport {
            expired: expired.len(),
            failed: 0,
        };

        for entry in expired {
            let outcome = self.apply(&entry.event_type, FeedbackKind::Ignored).await;
            if !outcome.persisted && self.db.is_some() {
                report.failed += 1;
            }
            debug!(
                "Auto-timeout: '{}' ({}) marked ignored",
                entry.event_type, entry.id
            );
        }

        report
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    // ----- scores and decisions -----

    pub async fn get_score(&self, event_type: &str) -> f64 {
        let Some(db) = &self.db else {
            return DEFAULT_SCORE;
        };

        match db.get_score(event_type).await {
            Ok(score) => score.unwrap_or(DEFAULT_SCORE),
            Err(err) => {
                warn!("Failed to read score for {event_type}: {err:#}");
                DEFAULT_SCORE
            }
        }
    }

    /// Applies a raw delta without a ledger entry, for integrations that
    /// report pre-weighted reactions.
    pub async fn update_score(&self, event_type: &str, delta: f64) -> f64 {
        let Some(db) = &self.db else {
            return DEFAULT_SCORE;
        };

        match db.update_score(event_type, delta).await {
            Ok(score) => score,
            Err(err) => {
                warn!("Failed to update score for {event_type}: {err:#}");
                DEFAULT_SCORE
            }
        }
    }

    pub fn cooldown_for(&self, score: f64) -> u64 {
        policy::cooldown(score, self.config.base_cooldown_seconds)
    }

    pub async fn should_notify(&self, event_type: &str, urgency: Urgency) -> NotifyDecision {
        if urgency == Urgency::Critical {
            return NotifyDecision::critical();
        }

        let score = self.get_score(event_type).await;
        policy::evaluate(score, urgency, self.config.base_cooldown_seconds)
    }

    // ----- statistics -----

    pub async fn recent_feedback(&self, event_type: &str, limit: usize) -> Vec<FeedbackEntry> {
        let Some(db) = &self.db else {
            return Vec::new();
        };

        db.get_recent_feedback(event_type, limit)
            .await
            .unwrap_or_else(|err| {
                warn!("Failed to read feedback history for {event_type}: {err:#}");
                Vec::new()
            })
    }

    pub async fn counters(&self, event_type: &str) -> BTreeMap<String, u64> {
        let Some(db) = &self.db else {
            return BTreeMap::new();
        };

        db.get_counters(event_type).await.unwrap_or_else(|err| {
            warn!("Failed to read counters for {event_type}: {err:#}");
            BTreeMap::new()
        })
    }

    pub async fn all_scores(&self) -> BTreeMap<String, f64> {
        let Some(db) = &self.db else {
            return BTreeMap::new();
        };

        db.get_all_scores().await.unwrap_or_else(|err| {
            warn!("Failed to list feedback scores: {err:#}");
            BTreeMap::new()
        })
    }

    pub async fn stats(&self, event_type: &str) -> EventStats {
        let score = self.get_score(event_type).await;
        EventStats {
            score,
            cooldown_seconds: self.cooldown_for(score),
            counters: self.counters(event_type).await,
            recent_feedback: self.recent_feedback(event_type, STATS_RECENT_LIMIT).await,
        }
    }

    pub async fn overview(&self) -> FeedbackOverview {
        let mut event_types = BTreeMap::new();
        for event_type in self.all_scores().await.into_keys() {
            let stats = self.stats(&event_type).await;
            event_types.insert(event_type, stats);
        }

        FeedbackOverview {
            storage_available: self.db.is_some(),
            total_types: event_types.len(),
            event_types,
            pending_notifications: self.pending_count().await,
        }
    }
}
