pub mod utils;

pub mod activity;
pub mod commands;
pub mod db;
pub mod error;
pub mod events;
pub mod feedback;
pub mod models;
pub mod proactive;
pub mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use activity::{ActivityEngine, SignalConfig, SnapshotFileProvider, StateProvider, StaticStateProvider};
use db::Database;
use events::EventBus;
use feedback::{FeedbackTracker, TrackerConfig};
use proactive::ProactiveManager;
use settings::SettingsStore;

const DEFAULT_SETTINGS_PATH: &str = "mindhome.json";
const DEFAULT_DB_PATH: &str = "mindhome.sqlite3";

/// Everything a command handler may touch, built once at startup.
pub struct AppState {
    pub settings: SettingsStore,
    pub db: Option<Database>,
    pub tracker: Arc<FeedbackTracker>,
    pub activity: Arc<ActivityEngine>,
    pub proactive: ProactiveManager,
    pub bus: EventBus,
    /// Set when entity states are pushed in-process rather than read from a
    /// snapshot file.
    pub states: Option<Arc<StaticStateProvider>>,
}

impl AppState {
    /// Wires the components together, restores the last-known activity and
    /// starts the timeout sweep. `db = None` runs with storage unavailable.
    pub async fn initialize(settings: SettingsStore, db: Option<Database>) -> Result<Self> {
        let (provider, states): (Arc<dyn StateProvider>, Option<Arc<StaticStateProvider>>) =
            match &settings.activity().entities.states_path {
                Some(path) => {
                    info!("Reading entity states from {}", path.display());
                    (Arc::new(SnapshotFileProvider::new(path.clone())), None)
                }
                None => {
                    let provider = Arc::new(StaticStateProvider::default());
                    (provider.clone(), Some(provider))
                }
            };

        Self::with_provider(settings, db, provider, states).await
    }

    pub async fn with_provider(
        settings: SettingsStore,
        db: Option<Database>,
        provider: Arc<dyn StateProvider>,
        states: Option<Arc<StaticStateProvider>>,
    ) -> Result<Self> {
        let tracker = Arc::new(FeedbackTracker::new(
            TrackerConfig::from(settings.feedback()),
            db.clone(),
        ));

        let signal_config = SignalConfig::from_settings(settings.activity(), settings.proactive());
        let activity = Arc::new(ActivityEngine::new(provider, signal_config, db.clone()));
        activity.restore().await;

        let bus = EventBus::default();
        let proactive = ProactiveManager::new(
            settings.proactive().clone(),
            Arc::clone(&tracker),
            Arc::clone(&activity),
            db.clone(),
            bus.clone(),
        );

        tracker.start().await?;

        Ok(Self {
            settings,
            db,
            tracker,
            activity,
            proactive,
            bus,
            states,
        })
    }

    /// Stops the sweep and waits for an in-flight tick to finish.
    pub async fn shutdown(&self) -> Result<()> {
        self.tracker.stop().await?;
        info!("MindHome stopped");
        Ok(())
    }
}

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var_os(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!("Failed to serialize output: {err}"),
    }
}

pub async fn run() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON line protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("MindHome starting up...");

    let settings = SettingsStore::new(env_path("MINDHOME_SETTINGS", DEFAULT_SETTINGS_PATH))?
        .with_env_overrides();

    let db = match Database::new(env_path("MINDHOME_DB", DEFAULT_DB_PATH)) {
        Ok(db) => Some(db),
        Err(err) => {
            warn!("Storage unavailable, continuing with default scores: {err:#}");
            None
        }
    };

    let state = AppState::initialize(settings, db)
        .await
        .context("failed to initialize MindHome")?;

    let mut messages = state.bus.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let reply = commands::handle_line(&state, &line).await;
                        print_json(&reply);
                    }
                    Ok(None) => {
                        info!("Input closed");
                        break;
                    }
                    Err(err) => {
                        warn!("Failed to read input: {err}");
                        break;
                    }
                }
            }
            message = messages.recv() => {
                match message {
                    Ok(message) => print_json(&serde_json::json!({ "event": "proactive", "message": message })),
                    Err(RecvError::Lagged(skipped)) => warn!("Dropped {skipped} proactive messages"),
                    Err(RecvError::Closed) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    state.shutdown().await
}
