use anyhow::{anyhow, Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::parse_datetime, models::ActivitySnapshot};
use crate::models::Activity;

impl Database {
    pub async fn save_activity_snapshot(&self, snapshot: &ActivitySnapshot) -> Result<()> {
        let record = snapshot.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO activity_state (id, activity, confidence, detected_at)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                     activity = excluded.activity,
                     confidence = excluded.confidence,
                     detected_at = excluded.detected_at",
                params![
                    record.activity.as_str(),
                    record.confidence,
                    record.detected_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to persist activity snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn load_activity_snapshot(&self) -> Result<Option<ActivitySnapshot>> {
        self.execute(|conn| {
            let row: Option<(String, f64, String)> = conn
                .query_row(
                    "SELECT activity, confidence, detected_at FROM activity_state WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((activity, confidence, detected_at)) = row else {
                return Ok(None);
            };

            let activity = Activity::from_label(&activity)
                .ok_or_else(|| anyhow!("unknown activity '{activity}' in activity_state"))?;

            Ok(Some(ActivitySnapshot {
                activity,
                confidence,
                detected_at: parse_datetime(&detected_at, "detected_at")?,
            }))
        })
        .await
    }
}
