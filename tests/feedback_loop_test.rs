use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use mindhome_lib::{
    db::{Database, FeedbackKind, DEFAULT_SCORE, LEDGER_CAPACITY},
    error::FeedbackError,
    feedback::{FeedbackTracker, GateReason, TrackerConfig, TOTAL_SENT},
    models::Urgency,
};

fn tracker(db: Option<Database>) -> FeedbackTracker {
    FeedbackTracker::new(TrackerConfig::default(), db)
}

fn in_memory_tracker() -> FeedbackTracker {
    tracker(Some(Database::open_in_memory().unwrap()))
}

#[tokio::test]
async fn unseen_event_type_scores_default() {
    let tracker = in_memory_tracker();
    assert_eq!(tracker.get_score("never_seen_event").await, DEFAULT_SCORE);
}

#[tokio::test]
async fn thanked_moves_fresh_score_to_point_seven() {
    let tracker = in_memory_tracker();
    tracker.track("n-1", "washer_done").await;

    let outcome = tracker.record_feedback("n-1", "thanked").await.unwrap();
    assert!((outcome.new_score - 0.7).abs() < 1e-9);
    assert!(outcome.persisted);
    assert!((tracker.get_score("washer_done").await - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn invalid_kind_changes_nothing() {
    let tracker = in_memory_tracker();
    tracker.track("n-1", "doorbell").await;

    let err = tracker.record_feedback("n-1", "loved").await.unwrap_err();
    assert_eq!(err, FeedbackError::InvalidKind { kind: "loved".into() });
    assert_eq!(tracker.pending_count().await, 1);
    assert_eq!(tracker.get_score("doorbell").await, DEFAULT_SCORE);
}

#[tokio::test]
async fn unknown_id_is_treated_as_event_type() {
    let tracker = in_memory_tracker();
    let outcome = tracker.record_feedback("energy_price_low", "engaged").await.unwrap();
    assert_eq!(outcome.event_type, "energy_price_low");
    assert!((outcome.new_score - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn strict_ids_reject_unknown_notifications() {
    let config = TrackerConfig {
        strict_ids: true,
        ..TrackerConfig::default()
    };
    let tracker = FeedbackTracker::new(config, Some(Database::open_in_memory().unwrap()));

    let err = tracker.record_feedback("no-such-id", "thanked").await.unwrap_err();
    assert!(matches!(err, FeedbackError::UnknownNotification { .. }));
}

#[tokio::test]
async fn timeout_records_exactly_one_ignored() {
    let tracker = in_memory_tracker();
    tracker.track("n-1", "weather_warning").await;

    // Nothing is stale yet.
    let report = tracker.expire_stale(Instant::now()).await;
    assert_eq!(report.expired, 0);

    let later = Instant::now() + tracker.config().auto_timeout + Duration::from_secs(1);
    let report = tracker.expire_stale(later).await;
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 0);

    // A second pass finds nothing left.
    assert_eq!(tracker.expire_stale(later).await.expired, 0);

    let ledger = tracker.recent_feedback("weather_warning", 10).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, FeedbackKind::Ignored);
    assert!((tracker.get_score("weather_warning").await - 0.45).abs() < 1e-9);
}

#[tokio::test]
async fn timed_out_notification_cannot_be_resolved_again() {
    let config = TrackerConfig {
        strict_ids: true,
        ..TrackerConfig::default()
    };
    let tracker = FeedbackTracker::new(config, Some(Database::open_in_memory().unwrap()));
    tracker.track("n-1", "doorbell").await;

    let later = Instant::now() + tracker.config().auto_timeout + Duration::from_secs(1);
    tracker.expire_stale(later).await;

    assert!(tracker.record_feedback("n-1", "thanked").await.is_err());
    assert_eq!(tracker.recent_feedback("doorbell", 10).await.len(), 1);
}

#[tokio::test]
async fn ledger_keeps_newest_fifty() {
    let tracker = in_memory_tracker();
    let total = LEDGER_CAPACITY + 10;

    for i in 0..total {
        let kind = FeedbackKind::ALL[i % FeedbackKind::ALL.len()];
        tracker.resolve("dryer_done", kind).await.unwrap();
    }

    let ledger = tracker.recent_feedback("dryer_done", 100).await;
    assert_eq!(ledger.len(), LEDGER_CAPACITY);

    for (offset, entry) in ledger.iter().enumerate() {
        let index = total - 1 - offset;
        assert_eq!(entry.kind, FeedbackKind::ALL[index % FeedbackKind::ALL.len()]);
    }
    assert!(ledger
        .windows(2)
        .all(|pair| pair[0].timestamp >= pair[1].timestamp));

    let counters = tracker.counters("dryer_done").await;
    let recorded: u64 = counters.values().sum();
    assert_eq!(recorded, total as u64);
}

#[tokio::test]
async fn doorbell_dismissed_three_times_is_gated() {
    let tracker = in_memory_tracker();

    let before = tracker.should_notify("doorbell", Urgency::Medium).await;
    assert!(before.allow);
    assert_eq!(before.reason, GateReason::ScoreOk);

    for n in 0..3 {
        let id = format!("doorbell-{n}");
        tracker.track(&id, "doorbell").await;
        tracker.resolve(&id, FeedbackKind::Dismissed).await.unwrap();
    }

    let score = tracker.get_score("doorbell").await;
    assert!((score - 0.2).abs() < 1e-9);

    let after = tracker.should_notify("doorbell", Urgency::Medium).await;
    assert!(!after.allow);
    assert_eq!(after.reason, GateReason::ScoreTooLow);

    assert!(tracker.should_notify("doorbell", Urgency::High).await.allow);
    assert!(tracker.should_notify("doorbell", Urgency::Critical).await.allow);
    assert!(!tracker.should_notify("doorbell", Urgency::Low).await.allow);

    assert_eq!(tracker.counters("doorbell").await.get(TOTAL_SENT), Some(&3));
}

#[tokio::test]
async fn storage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mindhome.sqlite3");

    {
        let tracker = tracker(Some(Database::new(path.clone()).unwrap()));
        tracker.resolve("person_arrived", FeedbackKind::Engaged).await.unwrap();
    }

    let reopened = tracker(Some(Database::new(path).unwrap()));
    assert!((reopened.get_score("person_arrived").await - 0.6).abs() < 1e-9);
    assert_eq!(reopened.recent_feedback("person_arrived", 5).await.len(), 1);
}

#[tokio::test]
async fn missing_storage_degrades_to_defaults() {
    let tracker = tracker(None);
    tracker.track("n-1", "doorbell").await;

    let outcome = tracker.record_feedback("n-1", "thanked").await.unwrap();
    assert!(!outcome.persisted);
    assert_eq!(outcome.new_score, DEFAULT_SCORE);
    assert_eq!(tracker.get_score("doorbell").await, DEFAULT_SCORE);
    assert!(tracker.recent_feedback("doorbell", 5).await.is_empty());

    let overview = tracker.overview().await;
    assert!(!overview.storage_available);
    assert_eq!(overview.total_types, 0);
}

#[tokio::test]
async fn background_sweep_expires_and_stops() {
    let config = TrackerConfig {
        auto_timeout: Duration::ZERO,
        sweep_interval: Duration::from_millis(50),
        ..TrackerConfig::default()
    };
    let tracker = Arc::new(FeedbackTracker::new(
        config,
        Some(Database::open_in_memory().unwrap()),
    ));

    tracker.start().await.unwrap();
    assert!(tracker.is_sweeping().await);
    assert!(tracker.start().await.is_err());

    tracker.track("n-1", "dryer_done").await;

    let deadline = Instant::now() + Duration::from_secs(5);
    while tracker.pending_count().await > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(tracker.pending_count().await, 0);

    tracker.stop().await.unwrap();
    assert!(!tracker.is_sweeping().await);

    let ledger = tracker.recent_feedback("dryer_done", 5).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, FeedbackKind::Ignored);
}

#[tokio::test]
async fn mixed_feedback_lands_exactly_on_threshold() {
    let tracker = in_memory_tracker();
    let sequence = [
        FeedbackKind::Thanked,
        FeedbackKind::Dismissed,
        FeedbackKind::Dismissed,
        FeedbackKind::Engaged,
        FeedbackKind::Dismissed,
        FeedbackKind::Ignored,
        FeedbackKind::Dismissed,
        FeedbackKind::Engaged,
        FeedbackKind::Ignored,
        FeedbackKind::Dismissed,
    ];
    for kind in sequence {
        tracker.resolve("person_left", kind).await.unwrap();
    }

    assert_eq!(tracker.get_score("person_left").await, 0.3);

    let decision = tracker.should_notify("person_left", Urgency::Medium).await;
    assert!(decision.allow);
    assert_eq!(decision.cooldown_seconds, 600);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_feedback_on_one_key_is_not_lost() {
    let tracker = Arc::new(in_memory_tracker());
    let writers = 4;

    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                tracker
                    .resolve("motion_detected_night", FeedbackKind::Ignored)
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let expected = DEFAULT_SCORE - 0.05 * writers as f64;
    assert!((tracker.get_score("motion_detected_night").await - expected).abs() < 1e-9);
    assert_eq!(
        tracker.recent_feedback("motion_detected_night", 10).await.len(),
        writers
    );
}

#[tokio::test]
async fn timeout_at_zero_score_stays_at_zero() {
    let tracker = in_memory_tracker();
    assert_eq!(tracker.update_score("energy_price_low", -1.0).await, 0.0);
    tracker.track("n-1", "energy_price_low").await;

    let later = Instant::now() + tracker.config().auto_timeout + Duration::from_secs(1);
    assert_eq!(tracker.expire_stale(later).await.expired, 1);

    assert_eq!(tracker.get_score("energy_price_low").await, 0.0);
    let ledger = tracker.recent_feedback("energy_price_low", 10).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, FeedbackKind::Ignored);
}
