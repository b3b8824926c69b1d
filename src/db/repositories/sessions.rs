use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_i64, to_u64},
    models::{ProcessingClaim, Session, SessionStatus, UserProfile},
};

pub(crate) fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: Option<String> = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let status: String = row.get("status")?;
    let duration_secs: i64 = row.get("duration_secs")?;
    let is_active: i64 = row.get("is_active")?;

    Ok(Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        device_id: row.get("device_id")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        status: parse_status(&status)?,
        is_active: is_active != 0,
        started_at: parse_optional_datetime(started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

const SESSION_COLUMNS: &str =
    "id, user_id, device_id, duration_secs, status, is_active, started_at, ended_at, created_at";

impl Database {
    /// Persist the profile and open a new session for its device.
    ///
    /// Any other active session for the device is deactivated in the same
    /// transaction, so at most one session per device is ever active.
    pub async fn start_session(&self, user: &UserProfile, session: &Session) -> Result<()> {
        let user = user.clone();
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO users (id, name, age, height_cm, weight_kg, training_frequency,
                                    fatigue_level, previous_injury, muscle_group, contraction_type,
                                    created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    user.id,
                    user.name,
                    user.age,
                    user.height_cm,
                    user.weight_kg,
                    user.training_frequency,
                    user.fatigue_level,
                    user.previous_injury,
                    user.muscle_group.as_str(),
                    user.contraction_type,
                    user.created_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                "UPDATE sessions SET is_active = 0 WHERE device_id = ?1 AND is_active = 1",
                params![record.device_id],
            )?;

            tx.execute(
                "INSERT INTO sessions (id, user_id, device_id, duration_secs, status, is_active,
                                       started_at, ended_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.user_id,
                    record.device_id,
                    to_i64(record.duration_secs)?,
                    record.status.as_str(),
                    record.is_active as i64,
                    record.started_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// The single active session for a device, if any.
    pub async fn get_active_session(&self, device_id: &str) -> Result<Option<Session>> {
        let device_id = device_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE device_id = ?1 AND is_active = 1
                 ORDER BY created_at DESC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query(params![device_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn count_active_sessions_for_device(&self, device_id: &str) -> Result<u64> {
        let device_id = device_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE device_id = ?1 AND is_active = 1",
                params![device_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    /// Atomically move a session from an endable state into `processing`.
    ///
    /// The check and the transition run in one transaction on the worker
    /// thread, so a second concurrent claim observes `processing` and
    /// reports `Ineligible` instead of double-processing.
    pub async fn claim_session_for_processing(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
    ) -> Result<ProcessingClaim> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM sessions WHERE id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;

            let status = match status {
                Some(raw) => parse_status(&raw)?,
                None => return Ok(ProcessingClaim::Missing),
            };
            if !status.can_end() {
                return Ok(ProcessingClaim::Ineligible(status));
            }

            tx.execute(
                "UPDATE sessions SET status = ?1, ended_at = ?2 WHERE id = ?3",
                params![
                    SessionStatus::Processing.as_str(),
                    ended_at.to_rfc3339(),
                    session_id,
                ],
            )?;

            let mut stmt = tx.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;
            let session = stmt.query_row(params![session_id], |row| {
                Ok(row_to_session(row))
            })??;
            drop(stmt);

            tx.commit()?;
            Ok(ProcessingClaim::Claimed(session))
        })
        .await
    }

    /// Drive a session to the terminal `failed` state.
    pub async fn mark_session_failed(&self, session_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = COALESCE(ended_at, ?2)
                 WHERE id = ?3",
                params![
                    SessionStatus::Failed.as_str(),
                    ended_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Fail every session a previous process left non-terminal. Run once at
    /// startup; returns the ids that were recovered.
    pub async fn recover_stranded_sessions(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let mut stmt = tx.prepare(
                "SELECT id FROM sessions WHERE status IN ('pending', 'collecting', 'processing')",
            )?;
            let ids: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<_, _>>()?;
            drop(stmt);

            for id in &ids {
                tx.execute(
                    "UPDATE sessions
                     SET status = 'failed',
                         is_active = 0,
                         ended_at = COALESCE(ended_at, ?1)
                     WHERE id = ?2",
                    params![now.to_rfc3339(), id],
                )?;
            }

            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
