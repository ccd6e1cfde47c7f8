use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Activity;

/// Last classified activity, persisted as the fallback for sensor outages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub activity: Activity,
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
}
