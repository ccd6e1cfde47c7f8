use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use mindhome_lib::{
    activity::{
        classify, collect_signals, delivery_for_labels, delivery_method, ActivityEngine,
        ActivitySignals, EntityState, SignalConfig, SnapshotFileProvider, StateProvider,
        StaticStateProvider, DEGRADED_CONFIDENCE,
    },
    db::Database,
    models::{Activity, DeliveryMethod, Urgency},
};

struct FailingProvider;

#[async_trait]
impl StateProvider for FailingProvider {
    async fn get_states(&self) -> Result<Vec<EntityState>> {
        Err(anyhow!("home controller unreachable"))
    }
}

#[test]
fn sleeping_takes_precedence_over_call() {
    let signals = ActivitySignals {
        away: false,
        sleeping: true,
        in_call: true,
        ..ActivitySignals::default()
    };
    let (activity, _) = classify(&signals);
    assert_eq!(activity, Activity::Sleeping);
}

#[test]
fn away_outranks_everything() {
    let signals = ActivitySignals {
        away: true,
        sleeping: true,
        in_call: true,
        media_playing: true,
        guests: true,
        pc_active: true,
        ..ActivitySignals::default()
    };
    assert_eq!(classify(&signals), (Activity::Away, 0.95));
}

#[test]
fn every_activity_urgency_pair_has_a_method() {
    let methods = [
        DeliveryMethod::TtsLoud,
        DeliveryMethod::TtsQuiet,
        DeliveryMethod::LedBlink,
        DeliveryMethod::Suppress,
    ];
    for activity in Activity::ALL {
        for urgency in Urgency::ALL {
            assert!(methods.contains(&delivery_method(activity, urgency)));
        }
    }
}

#[test]
fn label_lookup_falls_back_to_relaxing() {
    assert_eq!(delivery_for_labels("napping", "low"), DeliveryMethod::TtsQuiet);
    assert_eq!(delivery_for_labels("sleeping", "bogus"), DeliveryMethod::TtsLoud);
    assert_eq!(delivery_for_labels("in_call", "high"), DeliveryMethod::LedBlink);
}

#[test]
fn night_with_lights_off_reads_as_sleeping() {
    let states = vec![
        EntityState::new("person.alex", "home"),
        EntityState::new("light.bedroom", "off"),
        EntityState::new("light.hall", "off"),
    ];
    let config = SignalConfig::default();

    let night = collect_signals(&states, &config, 23);
    assert_eq!(classify(&night), (Activity::Sleeping, 0.90));

    let day = collect_signals(&states, &config, 15);
    assert_eq!(classify(&day).0, Activity::Relaxing);
}

#[test]
fn two_people_home_are_guests() {
    let states = vec![
        EntityState::new("person.alex", "home"),
        EntityState::new("person.sam", "home"),
        EntityState::new("light.living_room", "on"),
    ];
    let signals = collect_signals(&states, &SignalConfig::default(), 18);
    assert_eq!(classify(&signals).0, Activity::Guests);
}

#[tokio::test]
async fn provider_failure_falls_back_to_last_known() {
    let engine = ActivityEngine::new(Arc::new(FailingProvider), SignalConfig::default(), None);
    let detection = engine.detect_at_hour(12).await;

    assert_eq!(detection.activity, Activity::Relaxing);
    assert_eq!(detection.confidence, DEGRADED_CONFIDENCE);
    assert!(detection.signals.data_unavailable);
}

#[tokio::test]
async fn last_known_activity_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mindhome.sqlite3");

    {
        let provider = Arc::new(StaticStateProvider::new(vec![
            EntityState::new("person.alex", "home"),
            EntityState::new("binary_sensor.mic_active", "on"),
        ]));
        let engine = ActivityEngine::new(
            provider,
            SignalConfig::default(),
            Some(Database::new(db_path.clone()).unwrap()),
        );
        assert_eq!(engine.detect_at_hour(10).await.activity, Activity::InCall);
    }

    let engine = ActivityEngine::new(
        Arc::new(StaticStateProvider::default()),
        SignalConfig::default(),
        Some(Database::new(db_path).unwrap()),
    );
    engine.restore().await;

    let detection = engine.detect_at_hour(10).await;
    assert_eq!(detection.activity, Activity::InCall);
    assert_eq!(detection.confidence, DEGRADED_CONFIDENCE);
}

#[tokio::test]
async fn snapshot_file_feeds_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("states.json");
    std::fs::write(
        &path,
        r#"[
            {"entity_id": "person.alex", "state": "home"},
            {"entity_id": "media_player.living_room", "state": "playing"}
        ]"#,
    )
    .unwrap();

    let engine = ActivityEngine::new(
        Arc::new(SnapshotFileProvider::new(path)),
        SignalConfig::default(),
        None,
    );

    let plan = {
        let detection = engine.detect_at_hour(20).await;
        assert_eq!(detection.activity, Activity::Watching);
        mindhome_lib::activity::plan_for(detection, Urgency::Medium)
    };
    assert!(plan.suppress);
    assert_eq!(plan.delivery, DeliveryMethod::Suppress);
}
