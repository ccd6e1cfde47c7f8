use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Pending notifications older than this are recorded as ignored.
    pub auto_timeout_seconds: u64,
    pub base_cooldown_seconds: u64,
    pub sweep_interval_secs: u64,
    /// Reject feedback for unknown notification ids instead of treating the id
    /// as an event type.
    pub strict_ids: bool,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            auto_timeout_seconds: 120,
            base_cooldown_seconds: 300,
            sweep_interval_secs: 30,
            strict_ids: false,
        }
    }
}

impl FeedbackSettings {
    pub fn auto_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityEntities {
    pub mic_sensors: Vec<String>,
    pub bed_sensors: Vec<String>,
    pub pc_sensors: Vec<String>,
    /// JSON snapshot of entity states read by the standalone binary.
    pub states_path: Option<PathBuf>,
}

impl Default for ActivityEntities {
    fn default() -> Self {
        Self {
            mic_sensors: vec![
                "binary_sensor.mic_active".into(),
                "binary_sensor.microphone".into(),
            ],
            bed_sensors: vec![
                "binary_sensor.bed_occupancy".into(),
                "binary_sensor.bett".into(),
            ],
            pc_sensors: vec![
                "binary_sensor.pc_active".into(),
                "binary_sensor.computer".into(),
                "switch.pc".into(),
            ],
            states_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityThresholds {
    pub night_start: u32,
    pub night_end: u32,
    pub guest_person_count: usize,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            night_start: 22,
            night_end: 7,
            guest_person_count: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySettings {
    pub entities: ActivityEntities,
    pub thresholds: ActivityThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProactiveSettings {
    pub enabled: bool,
    /// 1 answers commands only; 2 and above may speak up unprompted.
    /// Critical events ignore the level.
    pub autonomy_level: u8,
    /// Scenes that silence every non-critical notification while active.
    pub silence_scenes: Vec<String>,
}

impl Default for ProactiveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            autonomy_level: 2,
            silence_scenes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub feedback: FeedbackSettings,
    pub activity: ActivitySettings,
    pub proactive: ProactiveSettings,
}

/// Settings read once at startup; immutable for the life of the process.
pub struct SettingsStore {
    data: Settings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Settings file {} is invalid ({err}); falling back to defaults",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self { data })
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self { data: settings }
    }

    pub fn feedback(&self) -> &FeedbackSettings {
        &self.data.feedback
    }

    pub fn activity(&self) -> &ActivitySettings {
        &self.data.activity
    }

    pub fn proactive(&self) -> &ProactiveSettings {
        &self.data.proactive
    }

    /// Applies the `MINDHOME_DEBUG` switch: a one-second sweep interval.
    pub fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var("MINDHOME_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.data.feedback.sweep_interval_secs = 1;
        }
        self
    }
}
