use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime},
};

impl Database {
    /// Records when a proactive message of `event_type` last went out. With a
    /// `ttl` the entry stops counting once it expires.
    pub async fn set_last_notification(
        &self,
        event_type: &str,
        sent_at: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let event_type = event_type.to_string();
        let expires_at = ttl.map(|ttl| (sent_at + ttl).to_rfc3339());
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO notification_log (event_type, sent_at, expires_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(event_type) DO UPDATE SET
                     sent_at = excluded.sent_at,
                     expires_at = excluded.expires_at",
                params![event_type, sent_at.to_rfc3339(), expires_at],
            )
            .with_context(|| "failed to record notification time")?;
            Ok(())
        })
        .await
    }

    /// Last send time for `event_type`, ignoring entries expired at `now`.
    pub async fn get_last_notification(
        &self,
        event_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let event_type = event_type.to_string();
        self.execute(move |conn| {
            let row: Option<(String, Option<String>)> = conn
                .query_row(
                    "SELECT sent_at, expires_at FROM notification_log WHERE event_type = ?1",
                    params![event_type],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((sent_at, expires_at)) = row else {
                return Ok(None);
            };

            if let Some(expires_at) = parse_optional_datetime(expires_at, "expires_at")? {
                if expires_at <= now {
                    return Ok(None);
                }
            }

            parse_datetime(&sent_at, "sent_at").map(Some)
        })
        .await
    }
}
