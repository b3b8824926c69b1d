use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{EmgChunk, Session, SessionStatus},
    repositories::sessions::row_to_session,
};

impl Database {
    /// Append a chunk to the device's active session.
    ///
    /// Locates the unique active session in `{pending, collecting}` (most
    /// recently created when ambiguous), records `started_at` and the
    /// `pending -> collecting` transition on the first chunk, and inserts
    /// the samples. The lookup, transition and insert run as one unit on
    /// the worker thread, so concurrent ingests never reorder or drop
    /// chunks.
    ///
    /// Returns the target session, or `None` when the device has no
    /// eligible session.
    pub async fn append_chunk(
        &self,
        device_id: &str,
        samples: Vec<f64>,
        captured_at: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let device_id = device_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let session = {
                let mut stmt = tx.prepare(
                    "SELECT id, user_id, device_id, duration_secs, status, is_active,
                            started_at, ended_at, created_at
                     FROM sessions
                     WHERE device_id = ?1
                       AND is_active = 1
                       AND status IN ('pending', 'collecting')
                     ORDER BY created_at DESC
                     LIMIT 1",
                )?;
                let mut rows = stmt.query(params![device_id])?;
                match rows.next()? {
                    Some(row) => row_to_session(row)?,
                    None => return Ok(None),
                }
            };

            let mut session = session;
            if session.status == SessionStatus::Pending {
                tx.execute(
                    "UPDATE sessions SET status = 'collecting', started_at = ?1 WHERE id = ?2",
                    params![captured_at.to_rfc3339(), session.id],
                )?;
                session.status = SessionStatus::Collecting;
                session.started_at = Some(captured_at);
            }

            let samples_json =
                serde_json::to_string(&samples).context("failed to serialize chunk samples")?;
            tx.execute(
                "INSERT INTO emg_chunks (session_id, samples_json, captured_at)
                 VALUES (?1, ?2, ?3)",
                params![session.id, samples_json, captured_at.to_rfc3339()],
            )?;

            tx.commit()?;
            Ok(Some(session))
        })
        .await
    }

    /// All chunks for a session, in append order.
    pub async fn get_chunks_for_session(&self, session_id: &str) -> Result<Vec<EmgChunk>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, samples_json, captured_at
                 FROM emg_chunks
                 WHERE session_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut chunks = Vec::new();
            while let Some(row) = rows.next()? {
                let samples_json: String = row.get(2)?;
                let captured_at: String = row.get(3)?;
                chunks.push(EmgChunk {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    samples: serde_json::from_str(&samples_json)
                        .context("failed to parse chunk samples")?,
                    captured_at: parse_datetime(&captured_at, "captured_at")?,
                });
            }

            Ok(chunks)
        })
        .await
    }
}
