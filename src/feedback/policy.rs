//! Pure decision rules: adaptive cooldown and the urgency/score gate.
//!
//! Nothing here touches storage, so every rule can be exercised with plain
//! numbers.

use serde::Serialize;

use crate::models::Urgency;

/// Below this even high-urgency notifications are dropped.
pub const SCORE_SUPPRESS: f64 = 0.15;
/// Below this medium notifications are dropped and cooldown is 5x.
pub const SCORE_REDUCE: f64 = 0.30;
/// Below this low notifications are dropped and cooldown is 2x.
pub const SCORE_NORMAL: f64 = 0.50;
/// At or above this cooldown shrinks to 0.6x.
pub const SCORE_BOOST: f64 = 0.70;

/// Recommended wait before repeating a notification, in whole seconds.
/// Non-increasing in `score`.
pub fn cooldown(score: f64, base_seconds: u64) -> u64 {
    let multiplier = if score >= SCORE_BOOST {
        0.6
    } else if score >= SCORE_NORMAL {
        1.0
    } else if score >= SCORE_REDUCE {
        2.0
    } else {
        5.0
    };

    (base_seconds as f64 * multiplier) as u64
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    CriticalAlwaysAllowed,
    HighPriority,
    ScoreOk,
    ScoreTooLow,
    LowPriorityScoreInsufficient,
}

impl GateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateReason::CriticalAlwaysAllowed => "critical_always_allowed",
            GateReason::HighPriority => "high_priority",
            GateReason::ScoreOk => "score_ok",
            GateReason::ScoreTooLow => "score_too_low",
            GateReason::LowPriorityScoreInsufficient => "low_priority_score_insufficient",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotifyDecision {
    pub allow: bool,
    pub reason: GateReason,
    /// Score the decision was based on; critical decisions never read it.
    pub score: Option<f64>,
    pub cooldown_seconds: u64,
}

impl NotifyDecision {
    pub fn critical() -> Self {
        Self {
            allow: true,
            reason: GateReason::CriticalAlwaysAllowed,
            score: None,
            cooldown_seconds: 0,
        }
    }

    fn deny(reason: GateReason, score: f64) -> Self {
        Self {
            allow: false,
            reason,
            score: Some(score),
            cooldown_seconds: 0,
        }
    }

    fn allow(reason: GateReason, score: f64, base_seconds: u64) -> Self {
        Self {
            allow: true,
            reason,
            score: Some(score),
            cooldown_seconds: cooldown(score, base_seconds),
        }
    }

    /// Human-readable reason, with the score for denials.
    pub fn describe(&self) -> String {
        match (self.allow, self.score) {
            (false, Some(score)) => format!("{} ({score:.2})", self.reason.as_str()),
            _ => self.reason.as_str().to_string(),
        }
    }
}

/// Gate table, first match wins. Tolerance for low scores shrinks as urgency
/// drops; critical is never suppressed.
pub fn evaluate(score: f64, urgency: Urgency, base_seconds: u64) -> NotifyDecision {
    match urgency {
        Urgency::Critical => NotifyDecision::critical(),
        Urgency::High if score < SCORE_SUPPRESS => {
            NotifyDecision::deny(GateReason::ScoreTooLow, score)
        }
        Urgency::High => NotifyDecision::allow(GateReason::HighPriority, score, base_seconds),
        Urgency::Medium if score < SCORE_REDUCE => {
            NotifyDecision::deny(GateReason::ScoreTooLow, score)
        }
        Urgency::Medium => NotifyDecision::allow(GateReason::ScoreOk, score, base_seconds),
        Urgency::Low if score < SCORE_NORMAL => {
            NotifyDecision::deny(GateReason::LowPriorityScoreInsufficient, score)
        }
        Urgency::Low => NotifyDecision::allow(GateReason::ScoreOk, score, base_seconds),
    }
}
