use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FeedbackError;

/// Caller-supplied importance of a proactive notification, most lenient first.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Critical,
        Urgency::High,
        Urgency::Medium,
        Urgency::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = FeedbackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Urgency::Critical),
            "high" => Ok(Urgency::High),
            "medium" => Ok(Urgency::Medium),
            "low" => Ok(Urgency::Low),
            _ => Err(FeedbackError::InvalidUrgency {
                urgency: value.to_string(),
            }),
        }
    }
}
