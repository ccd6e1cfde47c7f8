use std::sync::Arc;

use chrono::{DateTime, Local, Timelike, Utc};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    db::{ActivitySnapshot, Database},
    models::{Activity, DeliveryMethod, Urgency},
    utils::RingBuffer,
};

use super::{
    classifier::{classify, DEGRADED_CONFIDENCE},
    matrix::resolve_delivery,
    provider::StateProvider,
    signals::{collect_signals, ActivitySignals, SignalConfig},
};

const MAX_RECENT_DETECTIONS: usize = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub activity: Activity,
    pub confidence: f64,
    pub signals: ActivitySignals,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPlan {
    pub activity: Activity,
    pub delivery: DeliveryMethod,
    pub suppress: bool,
    pub confidence: f64,
    pub signals: ActivitySignals,
}

struct EngineState {
    last: ActivitySnapshot,
    history: RingBuffer<Detection>,
}

/// Detects what the household is doing and how loudly it may be disturbed.
pub struct ActivityEngine {
    provider: Arc<dyn StateProvider>,
    config: SignalConfig,
    db: Option<Database>,
    state: Mutex<EngineState>,
}

impl ActivityEngine {
    pub fn new(provider: Arc<dyn StateProvider>, config: SignalConfig, db: Option<Database>) -> Self {
        Self {
            provider,
            config,
            db,
            state: Mutex::new(EngineState {
                last: ActivitySnapshot {
                    activity: Activity::Relaxing,
                    confidence: DEGRADED_CONFIDENCE,
                    detected_at: Utc::now(),
                },
                history: RingBuffer::new(MAX_RECENT_DETECTIONS),
            }),
        }
    }

    /// Restores the last-known activity persisted by a previous run.
    pub async fn restore(&self) {
        let Some(db) = &self.db else {
            return;
        };

        match db.load_activity_snapshot().await {
            Ok(Some(snapshot)) => {
                debug!("Restored last-known activity {}", snapshot.activity);
                self.state.lock().await.last = snapshot;
            }
            Ok(None) => {}
            Err(err) => warn!("Failed to restore last-known activity: {err:#}"),
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub async fn last_known(&self) -> ActivitySnapshot {
        self.state.lock().await.last.clone()
    }

    /// Newest-first copy of recent detections.
    pub async fn recent_detections(&self) -> Vec<Detection> {
        self.state.lock().await.history.to_vec_newest()
    }

    pub async fn detect(&self) -> Detection {
        self.detect_at_hour(Local::now().hour()).await
    }

    /// Classifies the current snapshot as if the local hour were `hour`.
    /// Missing sensor data yields the last-known activity at reduced
    /// confidence.
    pub async fn detect_at_hour(&self, hour: u32) -> Detection {
        let states = match self.provider.get_states().await {
            Ok(states) => states,
            Err(err) => {
                warn!("State provider failed: {err:#}");
                Vec::new()
            }
        };

        let signals = collect_signals(&states, &self.config, hour);
        let now = Utc::now();

        if signals.data_unavailable {
            let last = self.state.lock().await.last.activity;
            return Detection {
                activity: last,
                confidence: DEGRADED_CONFIDENCE,
                signals,
                detected_at: now,
            };
        }

        let (activity, confidence) = classify(&signals);
        let detection = Detection {
            activity,
            confidence,
            signals,
            detected_at: now,
        };

        {
            // Held across the write so the stored snapshot never lags a newer
            // in-memory one.
            let mut state = self.state.lock().await;
            let changed = state.last.activity != activity;
            state.last = ActivitySnapshot {
                activity,
                confidence,
                detected_at: now,
            };
            state.history.push(detection.clone());

            if changed {
                self.persist(&state.last).await;
            }
        }

        debug!(
            "Activity detected: {} (confidence: {:.2}, signals: {:?})",
            activity, confidence, detection.signals
        );

        detection
    }

    async fn persist(&self, snapshot: &ActivitySnapshot) {
        let Some(db) = &self.db else {
            return;
        };

        if let Err(err) = db.save_activity_snapshot(snapshot).await {
            warn!("Failed to persist activity snapshot: {err:#}");
        }
    }

    /// Detects the activity and maps it to a delivery channel for `urgency`.
    pub async fn should_deliver(&self, urgency: Urgency) -> DeliveryPlan {
        let detection = self.detect().await;
        plan_for(detection, urgency)
    }
}

pub fn plan_for(detection: Detection, urgency: Urgency) -> DeliveryPlan {
    let delivery = resolve_delivery(
        detection.activity,
        urgency,
        detection.signals.silence_scene,
    );

    DeliveryPlan {
        activity: detection.activity,
        delivery,
        suppress: delivery.is_suppressed(),
        confidence: detection.confidence,
        signals: detection.signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{provider::StaticStateProvider, signals::EntityState};

    fn engine(states: Vec<EntityState>) -> (ActivityEngine, Arc<StaticStateProvider>) {
        let provider = Arc::new(StaticStateProvider::new(states));
        let engine = ActivityEngine::new(provider.clone(), SignalConfig::default(), None);
        (engine, provider)
    }

    #[tokio::test]
    async fn empty_snapshot_returns_last_known_with_low_confidence() {
        let (engine, provider) = engine(vec![
            EntityState::new("person.alex", "home"),
            EntityState::new("media_player.tv", "playing"),
        ]);

        let first = engine.detect_at_hour(20).await;
        assert_eq!(first.activity, Activity::Watching);

        provider.replace(Vec::new());
        let degraded = engine.detect_at_hour(20).await;
        assert_eq!(degraded.activity, Activity::Watching);
        assert_eq!(degraded.confidence, DEGRADED_CONFIDENCE);
        assert!(degraded.signals.data_unavailable);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let (engine, _) = engine(vec![EntityState::new("person.alex", "home")]);
        for _ in 0..(MAX_RECENT_DETECTIONS + 5) {
            engine.detect_at_hour(12).await;
        }
        assert_eq!(engine.recent_detections().await.len(), MAX_RECENT_DETECTIONS);
    }

    #[tokio::test]
    async fn restore_reads_persisted_activity() {
        let db = Database::open_in_memory().unwrap();
        db.save_activity_snapshot(&ActivitySnapshot {
            activity: Activity::Sleeping,
            confidence: 0.9,
            detected_at: Utc::now(),
        })
        .await
        .unwrap();

        let provider = Arc::new(StaticStateProvider::default());
        let engine = ActivityEngine::new(provider, SignalConfig::default(), Some(db));
        engine.restore().await;

        let detection = engine.detect_at_hour(2).await;
        assert_eq!(detection.activity, Activity::Sleeping);
        assert!(detection.signals.data_unavailable);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stored_snapshot_follows_last_detection_under_contention() {
        let db = Database::open_in_memory().unwrap();
        let provider = Arc::new(StaticStateProvider::new(vec![
            EntityState::new("person.alex", "home"),
            EntityState::new("binary_sensor.bed_occupancy", "on"),
        ]));
        let engine = Arc::new(ActivityEngine::new(provider, SignalConfig::default(), Some(db.clone())));

        let handles: Vec<_> = (0..16u32)
            .map(|i| {
                let engine = Arc::clone(&engine);
                // Night hours classify as sleeping, midday as relaxing.
                let hour = if i % 2 == 0 { 2 } else { 12 };
                tokio::spawn(async move { engine.detect_at_hour(hour).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = db.load_activity_snapshot().await.unwrap();
        let in_memory = engine.last_known().await;
        // Nothing is stored when every detection matched the initial default.
        let stored_activity = stored.map(|s| s.activity).unwrap_or(Activity::Relaxing);
        assert_eq!(stored_activity, in_memory.activity);
    }

    #[test]
    fn plan_honours_silence_scene() {
        let detection = Detection {
            activity: Activity::Relaxing,
            confidence: 0.6,
            signals: ActivitySignals {
                silence_scene: true,
                ..ActivitySignals::default()
            },
            detected_at: Utc::now(),
        };

        let plan = plan_for(detection.clone(), Urgency::Medium);
        assert!(plan.suppress);

        let critical = plan_for(detection, Urgency::Critical);
        assert_eq!(critical.delivery, DeliveryMethod::TtsLoud);
    }
}
