use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::FeedbackKind;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_kind(value: &str) -> Result<FeedbackKind> {
    value
        .parse::<FeedbackKind>()
        .map_err(|err| anyhow!("corrupt feedback_history row: {err}"))
}

/// Scores are kept on a 1e-6 grid so repeated deltas cannot drift across
/// the gate and cooldown thresholds.
const SCORE_SCALE: f64 = 1_000_000.0;

pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    ((value * SCORE_SCALE).round() / SCORE_SCALE).clamp(0.0, 1.0)
}
