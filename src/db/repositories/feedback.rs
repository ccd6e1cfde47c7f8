use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{clamp_score, parse_datetime, parse_kind, to_i64, to_u64},
    models::{FeedbackEntry, FeedbackKind},
};

/// Score reported for event types that have never been touched.
pub const DEFAULT_SCORE: f64 = 0.5;

/// Ledger rows kept per event type; older rows are evicted first.
pub const LEDGER_CAPACITY: usize = 50;

fn read_score(conn: &Connection, event_type: &str) -> rusqlite::Result<Option<f64>> {
    conn.query_row(
        "SELECT score FROM feedback_scores WHERE event_type = ?1",
        params![event_type],
        |row| row.get(0),
    )
    .optional()
}

fn write_score(
    conn: &Connection,
    event_type: &str,
    score: f64,
    updated_at: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO feedback_scores (event_type, score, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(event_type) DO UPDATE SET score = excluded.score, updated_at = excluded.updated_at",
        params![event_type, score, updated_at.to_rfc3339()],
    )
}

fn bump_counter(conn: &Connection, event_type: &str, name: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO feedback_counters (event_type, name, value)
         VALUES (?1, ?2, 1)
         ON CONFLICT(event_type, name) DO UPDATE SET value = value + 1
         RETURNING value",
        params![event_type, name],
        |row| row.get(0),
    )
}

fn apply_delta(
    conn: &Connection,
    event_type: &str,
    delta: f64,
    at: DateTime<Utc>,
) -> rusqlite::Result<f64> {
    let current = read_score(conn, event_type)?.unwrap_or(DEFAULT_SCORE);
    let next = clamp_score(current + delta);
    write_score(conn, event_type, next, at)?;
    Ok(next)
}

impl Database {
    /// Stored score for `event_type`, or `None` when it was never recorded.
    pub async fn get_score(&self, event_type: &str) -> Result<Option<f64>> {
        let event_type = event_type.to_string();
        self.execute(move |conn| {
            read_score(conn, &event_type).with_context(|| "failed to read feedback score")
        })
        .await
    }

    /// Adds `delta` to the score, clamps it to [0, 1] and returns the new value.
    pub async fn update_score(&self, event_type: &str, delta: f64) -> Result<f64> {
        let event_type = event_type.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let next = apply_delta(&tx, &event_type, delta, Utc::now())
                .with_context(|| format!("failed to update score for {event_type}"))?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    /// Applies one feedback event: score update, ledger append and trim, and
    /// the per-kind counter, all in a single transaction.
    pub async fn apply_feedback(
        &self,
        event_type: &str,
        kind: FeedbackKind,
        at: DateTime<Utc>,
    ) -> Result<f64> {
        let event_type = event_type.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open feedback transaction")?;

            let next = apply_delta(&tx, &event_type, kind.delta(), at)?;

            tx.execute(
                "INSERT INTO feedback_history (event_type, kind, delta, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![event_type, kind.as_str(), kind.delta(), at.to_rfc3339()],
            )?;

            tx.execute(
                "DELETE FROM feedback_history
                 WHERE event_type = ?1
                   AND id NOT IN (
                       SELECT id FROM feedback_history
                       WHERE event_type = ?1
                       ORDER BY id DESC
                       LIMIT ?2
                   )",
                params![event_type, to_i64(LEDGER_CAPACITY as u64)?],
            )?;

            bump_counter(&tx, &event_type, kind.as_str())?;

            tx.commit()
                .with_context(|| format!("failed to commit feedback for {event_type}"))?;
            Ok(next)
        })
        .await
    }

    pub async fn increment_counter(&self, event_type: &str, name: &str) -> Result<u64> {
        let event_type = event_type.to_string();
        let name = name.to_string();
        self.execute(move |conn| {
            let value = bump_counter(conn, &event_type, &name)
                .with_context(|| format!("failed to increment counter {name}"))?;
            to_u64(value, "feedback_counters.value")
        })
        .await
    }

    pub async fn get_counters(&self, event_type: &str) -> Result<BTreeMap<String, u64>> {
        let event_type = event_type.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, value FROM feedback_counters WHERE event_type = ?1",
            )?;
            let mut rows = stmt.query(params![event_type])?;
            let mut counters = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let name: String = row.get(0)?;
                let value = to_u64(row.get::<_, i64>(1)?, "feedback_counters.value")?;
                counters.insert(name, value);
            }
            Ok(counters)
        })
        .await
    }

    /// Newest-first snapshot of at most `limit` ledger entries.
    pub async fn get_recent_feedback(
        &self,
        event_type: &str,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>> {
        let event_type = event_type.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT kind, delta, timestamp
                 FROM feedback_history
                 WHERE event_type = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let mut rows = stmt.query(params![event_type, to_i64(limit as u64)?])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(FeedbackEntry {
                    kind: parse_kind(&row.get::<_, String>(0)?)?,
                    delta: row.get(1)?,
                    timestamp: parse_datetime(&row.get::<_, String>(2)?, "timestamp")?,
                });
            }
            Ok(entries)
        })
        .await
    }

    pub async fn get_all_scores(&self) -> Result<BTreeMap<String, f64>> {
        self.execute(|conn| {
            let mut stmt =
                conn.prepare("SELECT event_type, score FROM feedback_scores ORDER BY event_type")?;
            let mut rows = stmt.query([])?;
            let mut scores = BTreeMap::new();
            while let Some(row) = rows.next()? {
                scores.insert(row.get::<_, String>(0)?, row.get::<_, f64>(1)?);
            }
            Ok(scores)
        })
        .await
    }
}
