use std::fmt;

use serde::{Deserialize, Serialize};

/// Inferred real-world situation of the household.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Sleeping,
    InCall,
    Watching,
    Focused,
    Guests,
    #[default]
    Relaxing,
    Away,
}

impl Activity {
    pub const ALL: [Activity; 7] = [
        Activity::Sleeping,
        Activity::InCall,
        Activity::Watching,
        Activity::Focused,
        Activity::Guests,
        Activity::Relaxing,
        Activity::Away,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Sleeping => "sleeping",
            Activity::InCall => "in_call",
            Activity::Watching => "watching",
            Activity::Focused => "focused",
            Activity::Guests => "guests",
            Activity::Relaxing => "relaxing",
            Activity::Away => "away",
        }
    }

    /// Parses a stored or user-supplied label, ignoring case and surrounding
    /// whitespace; `None` for anything unknown.
    pub fn from_label(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Activity::ALL
            .into_iter()
            .find(|activity| activity.as_str() == value)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel used to surface an allowed notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    TtsLoud,
    TtsQuiet,
    LedBlink,
    Suppress,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::TtsLoud => "tts_loud",
            DeliveryMethod::TtsQuiet => "tts_quiet",
            DeliveryMethod::LedBlink => "led_blink",
            DeliveryMethod::Suppress => "suppress",
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, DeliveryMethod::Suppress)
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
