//! Raw sensor snapshot to boolean activity signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::settings::{ActivitySettings, ProactiveSettings};

/// One entity row from the home-automation state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or("")
    }

    pub fn object_id(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(_, object_id)| object_id)
            .unwrap_or(&self.entity_id)
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }

    fn is(&self, state: &str) -> bool {
        self.state == state
    }
}

/// Entity lists and thresholds the signal checks depend on.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub mic_sensors: Vec<String>,
    pub bed_sensors: Vec<String>,
    pub pc_sensors: Vec<String>,
    pub silence_scenes: Vec<String>,
    pub night_start: u32,
    pub night_end: u32,
    pub guest_person_count: usize,
}

impl SignalConfig {
    pub fn from_settings(activity: &ActivitySettings, proactive: &ProactiveSettings) -> Self {
        Self {
            mic_sensors: activity.entities.mic_sensors.clone(),
            bed_sensors: activity.entities.bed_sensors.clone(),
            pc_sensors: activity.entities.pc_sensors.clone(),
            silence_scenes: proactive
                .silence_scenes
                .iter()
                .map(|scene| scene.to_lowercase())
                .collect(),
            night_start: activity.thresholds.night_start,
            night_end: activity.thresholds.night_end,
            guest_person_count: activity.thresholds.guest_person_count,
        }
    }

    pub fn is_night(&self, hour: u32) -> bool {
        hour >= self.night_start || hour < self.night_end
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::from_settings(&ActivitySettings::default(), &ProactiveSettings::default())
    }
}

/// Signals derived from one snapshot. Recomputed on every classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySignals {
    pub away: bool,
    pub media_playing: bool,
    pub in_call: bool,
    pub sleeping: bool,
    pub pc_active: bool,
    pub guests: bool,
    pub lights_off: bool,
    /// A configured silence scene is active.
    pub silence_scene: bool,
    /// The snapshot was empty or could not be fetched.
    pub data_unavailable: bool,
}

impl ActivitySignals {
    pub fn unavailable() -> Self {
        Self {
            data_unavailable: true,
            ..Self::default()
        }
    }
}

pub fn collect_signals(states: &[EntityState], config: &SignalConfig, hour: u32) -> ActivitySignals {
    if states.is_empty() {
        return ActivitySignals::unavailable();
    }

    let persons_home = states
        .iter()
        .filter(|s| s.domain() == "person" && s.is("home"))
        .count();
    let lights_off = check_lights_off(states);

    ActivitySignals {
        away: persons_home == 0,
        media_playing: states
            .iter()
            .any(|s| s.domain() == "media_player" && s.is("playing")),
        in_call: any_listed_in_state(states, &config.mic_sensors, &["on"]),
        sleeping: config.is_night(hour)
            && (any_listed_in_state(states, &config.bed_sensors, &["on"]) || lights_off),
        pc_active: any_listed_in_state(states, &config.pc_sensors, &["on", "active"]),
        guests: persons_home >= config.guest_person_count,
        lights_off,
        silence_scene: check_silence_scene(states, &config.silence_scenes),
        data_unavailable: false,
    }
}

fn any_listed_in_state(states: &[EntityState], entity_ids: &[String], wanted: &[&str]) -> bool {
    states.iter().any(|s| {
        entity_ids.iter().any(|id| id == &s.entity_id) && wanted.iter().any(|w| s.is(w))
    })
}

/// True only when at least one light exists and none is on.
fn check_lights_off(states: &[EntityState]) -> bool {
    let mut lights = states.iter().filter(|s| s.domain() == "light").peekable();
    if lights.peek().is_none() {
        return false;
    }
    lights.all(|s| !s.is("on"))
}

fn check_silence_scene(states: &[EntityState], scenes: &[String]) -> bool {
    if scenes.is_empty() {
        return false;
    }

    states.iter().any(|s| {
        if !(s.is("on") || s.is("active")) {
            return false;
        }
        let names = [
            Some(s.entity_id.to_lowercase()),
            Some(s.object_id().to_lowercase()),
            s.friendly_name().map(str::to_lowercase),
        ];
        names
            .iter()
            .flatten()
            .any(|name| scenes.iter().any(|scene| scene == name))
    })
}
