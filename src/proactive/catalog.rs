use serde::{Deserialize, Serialize};

use crate::models::Urgency;

/// Known proactive event types with their default urgency and a short
/// description used when the caller provides no text.
const EVENT_TABLE: &[(&str, Urgency, &str)] = &[
    ("alarm_triggered", Urgency::Critical, "Alarm triggered"),
    ("smoke_detected", Urgency::Critical, "Smoke detected"),
    ("water_leak", Urgency::Critical, "Water leak detected"),
    ("motion_detected_night", Urgency::High, "Motion detected at night"),
    ("person_arrived", Urgency::Medium, "Someone arrived home"),
    ("person_left", Urgency::Medium, "Someone left home"),
    ("washer_done", Urgency::Medium, "The washing machine is done"),
    ("dryer_done", Urgency::Medium, "The dryer is done"),
    ("doorbell", Urgency::Medium, "Someone rang the doorbell"),
    ("energy_price_low", Urgency::Low, "Electricity is cheap right now"),
    ("weather_warning", Urgency::Low, "Weather warning"),
];

const WASHER_RUNNING_WATTS: f64 = 10.0;
const WASHER_IDLE_WATTS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpec {
    pub event_type: &'static str,
    pub urgency: Urgency,
    pub description: &'static str,
}

pub fn lookup(event_type: &str) -> Option<EventSpec> {
    EVENT_TABLE
        .iter()
        .find(|(name, _, _)| *name == event_type)
        .map(|&(event_type, urgency, description)| EventSpec {
            event_type,
            urgency,
            description,
        })
}

/// Urgency for `event_type`; unknown types are medium.
pub fn default_urgency(event_type: &str) -> Urgency {
    lookup(event_type).map_or(Urgency::Medium, |spec| spec.urgency)
}

/// Fallback text for `event_type`; unknown types describe themselves.
pub fn describe(event_type: &str) -> String {
    lookup(event_type).map_or_else(|| event_type.to_string(), |spec| spec.description.to_string())
}

/// An entity transition reported by the home controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateChange {
    pub entity_id: String,
    pub old_state: String,
    pub new_state: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

impl StateChange {
    pub fn new(
        entity_id: impl Into<String>,
        old_state: impl Into<String>,
        new_state: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            old_state: old_state.into(),
            new_state: new_state.into(),
            friendly_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredEvent {
    pub event_type: &'static str,
    pub urgency: Urgency,
    /// Entity or person the event is about.
    pub subject: String,
}

impl TriggeredEvent {
    fn from_catalog(event_type: &'static str, subject: impl Into<String>) -> Self {
        Self {
            event_type,
            urgency: default_urgency(event_type),
            subject: subject.into(),
        }
    }

    pub fn text(&self) -> String {
        format!("{} ({})", describe(self.event_type), self.subject)
    }
}

/// Maps an entity transition onto a proactive event, if any applies.
/// Unchanged states never trigger.
pub fn map_state_change(change: &StateChange) -> Option<TriggeredEvent> {
    let entity_id = change.entity_id.as_str();
    let old = change.old_state.as_str();
    let new = change.new_state.as_str();

    if entity_id.is_empty() || old == new {
        return None;
    }

    if entity_id.starts_with("alarm_control_panel.") && new == "triggered" {
        return Some(TriggeredEvent::from_catalog("alarm_triggered", entity_id));
    }
    if entity_id.starts_with("binary_sensor.smoke") && new == "on" {
        return Some(TriggeredEvent::from_catalog("smoke_detected", entity_id));
    }
    if entity_id.starts_with("binary_sensor.water") && new == "on" {
        return Some(TriggeredEvent::from_catalog("water_leak", entity_id));
    }
    if entity_id.contains("doorbell") && new == "on" {
        return Some(TriggeredEvent::from_catalog("doorbell", entity_id));
    }

    if entity_id.starts_with("person.") {
        let name = change.friendly_name.as_deref().unwrap_or(entity_id);
        return match (old == "home", new == "home") {
            (false, true) => Some(TriggeredEvent::from_catalog("person_arrived", name)),
            (true, false) => Some(TriggeredEvent::from_catalog("person_left", name)),
            _ => None,
        };
    }

    if entity_id.starts_with("sensor.") && is_washer(entity_id) {
        let old_watts = old.parse::<f64>().ok()?;
        let new_watts = new.parse::<f64>().ok()?;
        if old_watts > WASHER_RUNNING_WATTS && new_watts < WASHER_IDLE_WATTS {
            return Some(TriggeredEvent::from_catalog("washer_done", entity_id));
        }
    }

    None
}

fn is_washer(entity_id: &str) -> bool {
    entity_id.contains("washer") || entity_id.contains("waschmaschine")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_defaults_to_medium() {
        assert_eq!(default_urgency("robot_vacuum_stuck"), Urgency::Medium);
        assert_eq!(describe("robot_vacuum_stuck"), "robot_vacuum_stuck");
        assert_eq!(default_urgency("smoke_detected"), Urgency::Critical);
        assert_eq!(default_urgency("weather_warning"), Urgency::Low);
    }

    #[test]
    fn alarm_and_sensors_map_to_critical_events() {
        let alarm = map_state_change(&StateChange::new(
            "alarm_control_panel.home",
            "armed_away",
            "triggered",
        ))
        .unwrap();
        assert_eq!(alarm.event_type, "alarm_triggered");
        assert_eq!(alarm.urgency, Urgency::Critical);

        let water = map_state_change(&StateChange::new("binary_sensor.water_cellar", "off", "on"))
            .unwrap();
        assert_eq!(water.event_type, "water_leak");
    }

    #[test]
    fn person_transitions_use_friendly_name() {
        let mut change = StateChange::new("person.lisa", "not_home", "home");
        change.friendly_name = Some("Lisa".into());

        let event = map_state_change(&change).unwrap();
        assert_eq!(event.event_type, "person_arrived");
        assert_eq!(event.subject, "Lisa");

        let left = map_state_change(&StateChange::new("person.lisa", "home", "work")).unwrap();
        assert_eq!(left.event_type, "person_left");

        assert!(map_state_change(&StateChange::new("person.lisa", "work", "gym")).is_none());
    }

    #[test]
    fn washer_power_drop_signals_done() {
        let done = map_state_change(&StateChange::new("sensor.washer_power", "250.4", "1.2"));
        assert_eq!(done.map(|event| event.event_type), Some("washer_done"));

        assert!(map_state_change(&StateChange::new("sensor.washer_power", "8", "1")).is_none());
        assert!(
            map_state_change(&StateChange::new("sensor.washer_power", "250", "unavailable"))
                .is_none()
        );
    }

    #[test]
    fn unchanged_state_is_ignored() {
        assert!(map_state_change(&StateChange::new("binary_sensor.doorbell", "on", "on")).is_none());
    }
}
