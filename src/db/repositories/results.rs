use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    models::{FeatureSet, RiskScore, SessionResult, SessionStatus, TrainingAssignment},
};
use crate::prediction::RiskLevel;

impl Database {
    /// Persist the full derivation chain and mark the session `completed`,
    /// all in one transaction. Either the session ends up completed with
    /// its results readable, or nothing is written.
    pub async fn complete_session_with_results(
        &self,
        feature_set: &FeatureSet,
        risk_score: &RiskScore,
        assignment: &TrainingAssignment,
    ) -> Result<()> {
        let feature_set = feature_set.clone();
        let risk_score = risk_score.clone();
        let assignment = assignment.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let features_json = serde_json::to_string(&feature_set.features)
                .context("failed to serialize feature set")?;
            tx.execute(
                "INSERT INTO feature_sets (id, session_id, features_json, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    feature_set.id,
                    feature_set.session_id,
                    features_json,
                    feature_set.created_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                "INSERT INTO risk_scores (id, feature_set_id, score, level, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    risk_score.id,
                    risk_score.feature_set_id,
                    risk_score.score,
                    risk_score.level.as_str(),
                    risk_score.created_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                "INSERT INTO training_assignments (id, risk_score_id, assignment, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    assignment.id,
                    assignment.risk_score_id,
                    assignment.assignment,
                    assignment.created_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                "UPDATE sessions SET status = ?1 WHERE id = ?2",
                params![SessionStatus::Completed.as_str(), feature_set.session_id],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Resolve a completed session's result through its derivation chain.
    pub async fn get_result_for_session(&self, session_id: &str) -> Result<Option<SessionResult>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT rs.level, ta.assignment
                     FROM feature_sets fs
                     JOIN risk_scores rs ON rs.feature_set_id = fs.id
                     JOIN training_assignments ta ON ta.risk_score_id = rs.id
                     WHERE fs.session_id = ?1",
                    params![session_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((level, assignment)) => {
                    let risk_level = RiskLevel::parse(&level)
                        .with_context(|| format!("stored risk level '{level}' is invalid"))?;
                    Ok(Some(SessionResult {
                        risk_level,
                        training_assignment: assignment,
                    }))
                }
                None => Ok(None),
            }
        })
        .await
    }
}
