//! Feedback ledger records and the closed set of feedback kinds.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeedbackError;

/// How the user reacted to a proactive message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// No reaction before the auto-timeout.
    Ignored,
    /// Actively waved away.
    Dismissed,
    Acknowledged,
    Engaged,
    Thanked,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 5] = [
        FeedbackKind::Ignored,
        FeedbackKind::Dismissed,
        FeedbackKind::Acknowledged,
        FeedbackKind::Engaged,
        FeedbackKind::Thanked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Ignored => "ignored",
            FeedbackKind::Dismissed => "dismissed",
            FeedbackKind::Acknowledged => "acknowledged",
            FeedbackKind::Engaged => "engaged",
            FeedbackKind::Thanked => "thanked",
        }
    }

    /// Signed score change applied for this kind.
    pub fn delta(&self) -> f64 {
        match self {
            FeedbackKind::Ignored => -0.05,
            FeedbackKind::Dismissed => -0.10,
            FeedbackKind::Acknowledged => 0.05,
            FeedbackKind::Engaged => 0.10,
            FeedbackKind::Thanked => 0.20,
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = FeedbackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let label = value.trim().to_ascii_lowercase();
        FeedbackKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == label)
            .ok_or_else(|| FeedbackError::InvalidKind {
                kind: value.to_string(),
            })
    }
}

/// One immutable row of the per-event-type feedback ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub kind: FeedbackKind,
    pub delta: f64,
    pub timestamp: DateTime<Utc>,
}
