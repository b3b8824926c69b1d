//! Session lifecycle management.
//!
//! Owns the per-device state machine and orchestrates the end-of-session
//! pipeline: concatenate chunks -> filter and extract features -> assemble
//! and align the feature vector -> classify -> recommend. Every state
//! transition goes through the database worker thread, which serialises
//! concurrent callers, so the device-exclusivity and claim-once invariants
//! hold without extra locking here.

use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    Database, FeatureSet, ProcessingClaim, RiskScore, Session, SessionResult, SessionStatus,
    TrainingAssignment, UserProfile,
};
use crate::error::{Error, Result};
use crate::prediction::{self, ClassifierRegistry, MuscleGroup};
use crate::signal::{self, SignalConfig};

/// Caller-supplied athlete data for a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub training_frequency: u32,
    #[serde(default)]
    pub fatigue_level: Option<u32>,
    #[serde(default)]
    pub previous_injury: Option<String>,
    pub muscle_group: String,
    #[serde(default)]
    pub contraction_type: Option<String>,
}

/// Read-only view returned by status polls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusView {
    pub session_id: String,
    pub status: SessionStatus,
    /// Populated only once the session is `completed`.
    pub result: Option<SessionResult>,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    registry: Arc<ClassifierRegistry>,
    signal_config: SignalConfig,
    default_sampling_rate_hz: f64,
}

impl SessionManager {
    pub fn new(
        db: Database,
        registry: Arc<ClassifierRegistry>,
        signal_config: SignalConfig,
        default_sampling_rate_hz: f64,
    ) -> Self {
        Self {
            db,
            registry,
            signal_config,
            default_sampling_rate_hz,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Open a new session for a device.
    ///
    /// Any previously active session for the same device is deactivated in
    /// the same transaction that creates the new one, so exactly one
    /// session per device is active afterwards.
    pub async fn start_session(
        &self,
        user: NewUser,
        duration_secs: u64,
        device_id: &str,
    ) -> Result<String> {
        if device_id.trim().is_empty() {
            return Err(Error::Validation("device_id must not be empty".into()));
        }
        let muscle_group = validate_user(&user)?;

        let now = Utc::now();
        let profile = UserProfile {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            age: user.age,
            height_cm: user.height_cm,
            weight_kg: user.weight_kg,
            training_frequency: user.training_frequency,
            fatigue_level: user.fatigue_level,
            previous_injury: user
                .previous_injury
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "none".to_string()),
            muscle_group,
            contraction_type: user
                .contraction_type
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "isometric".to_string()),
            created_at: now,
        };

        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: profile.id.clone(),
            device_id: device_id.to_string(),
            duration_secs,
            status: SessionStatus::Pending,
            is_active: true,
            started_at: None,
            ended_at: None,
            created_at: now,
        };

        self.db.start_session(&profile, &session).await?;
        info!(
            "started session {} for device {} (muscle group {})",
            session.id, device_id, profile.muscle_group
        );
        Ok(session.id)
    }

    /// Append a chunk of raw samples to the device's active session.
    ///
    /// Never blocks on downstream processing; the first chunk moves the
    /// session from `pending` to `collecting`.
    pub async fn ingest_chunk(&self, device_id: &str, samples: Vec<f64>) -> Result<()> {
        if samples.is_empty() {
            return Err(Error::Validation("samples must not be empty".into()));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(Error::Validation("samples must be finite numbers".into()));
        }

        let captured_at = Utc::now();
        match self.db.append_chunk(device_id, samples, captured_at).await? {
            Some(_session) => Ok(()),
            None => Err(Error::NotFound(format!(
                "no active session for device '{device_id}'"
            ))),
        }
    }

    /// End a session and run the full pipeline to a terminal state.
    ///
    /// Only sessions in `{pending, collecting}` may be ended; repeated
    /// calls fail with a conflict. The call returns once the session is
    /// terminal: `completed` with the result, or `failed` with the pipeline
    /// error.
    pub async fn end_session(
        &self,
        session_id: &str,
        sampling_rate_hz: Option<f64>,
    ) -> Result<SessionResult> {
        let sampling_rate_hz = sampling_rate_hz.unwrap_or(self.default_sampling_rate_hz);
        let ended_at = Utc::now();

        let session = match self
            .db
            .claim_session_for_processing(session_id, ended_at)
            .await?
        {
            ProcessingClaim::Claimed(session) => session,
            ProcessingClaim::Missing => {
                return Err(Error::NotFound(format!("session '{session_id}' not found")));
            }
            ProcessingClaim::Ineligible(status) => {
                return Err(Error::Conflict(format!(
                    "session '{session_id}' is '{status}' and cannot be ended",
                    status = status.as_str()
                )));
            }
        };

        match self.run_pipeline(&session, sampling_rate_hz).await {
            Ok(result) => {
                info!(
                    "session {} completed with risk level {}",
                    session.id, result.risk_level
                );
                Ok(result)
            }
            Err(err) => {
                warn!("session {} pipeline failed: {err}", session.id);
                if let Err(mark_err) = self.db.mark_session_failed(&session.id, Utc::now()).await {
                    error!(
                        "failed to mark session {} as failed: {mark_err}",
                        session.id
                    );
                }
                Err(err)
            }
        }
    }

    /// Current state of a session, with the derived result once completed.
    pub async fn get_status(&self, session_id: &str) -> Result<SessionStatusView> {
        let session = self
            .db
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session '{session_id}' not found")))?;
        self.status_view(session).await
    }

    /// Status of the device's active session, or `None` when the device has
    /// never started one (or its last session was superseded away).
    pub async fn get_device_status(&self, device_id: &str) -> Result<Option<SessionStatusView>> {
        match self.db.get_active_session(device_id).await? {
            Some(session) => Ok(Some(self.status_view(session).await?)),
            None => Ok(None),
        }
    }

    async fn status_view(&self, session: Session) -> Result<SessionStatusView> {
        let result = if session.status == SessionStatus::Completed {
            self.db.get_result_for_session(&session.id).await?
        } else {
            None
        };
        Ok(SessionStatusView {
            session_id: session.id,
            status: session.status,
            result,
        })
    }

    /// Fail sessions a crashed process left non-terminal. Run at startup.
    pub async fn recover_stranded_sessions(&self) -> Result<usize> {
        let recovered = self.db.recover_stranded_sessions(Utc::now()).await?;
        for id in &recovered {
            warn!("recovered stranded session {id}; marked as failed");
        }
        Ok(recovered.len())
    }

    /// The processing stage run after a successful claim. Any error here
    /// leaves the session marked `failed` by the caller.
    async fn run_pipeline(&self, session: &Session, sampling_rate_hz: f64) -> Result<SessionResult> {
        let chunks = self.db.get_chunks_for_session(&session.id).await?;
        let raw_signal: Vec<f64> = chunks.into_iter().flat_map(|chunk| chunk.samples).collect();
        if raw_signal.is_empty() {
            return Err(Error::InvalidSignal(format!(
                "no EMG samples recorded for session '{}'",
                session.id
            )));
        }

        let user = self
            .db
            .get_user_for_session(&session.id)
            .await?
            .ok_or_else(|| {
                Error::Internal(anyhow::anyhow!(
                    "session '{}' has no owning user profile",
                    session.id
                ))
            })?;

        let features = signal::extract(&raw_signal, sampling_rate_hz, &self.signal_config)?;
        let vector = prediction::build(&user.inputs(), &features, user.muscle_group);
        let predicted = self.registry.predict(&vector, user.muscle_group)?;
        let assignment_text = prediction::recommend(predicted.level);

        let now = Utc::now();
        let feature_set = FeatureSet {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            features,
            created_at: now,
        };
        let risk_score = RiskScore {
            id: Uuid::new_v4().to_string(),
            feature_set_id: feature_set.id.clone(),
            score: predicted.score,
            level: predicted.level,
            created_at: now,
        };
        let assignment = TrainingAssignment {
            id: Uuid::new_v4().to_string(),
            risk_score_id: risk_score.id.clone(),
            assignment: assignment_text.to_string(),
            created_at: now,
        };

        self.db
            .complete_session_with_results(&feature_set, &risk_score, &assignment)
            .await?;

        Ok(SessionResult {
            risk_level: predicted.level,
            training_assignment: assignment.assignment,
        })
    }
}

fn validate_user(user: &NewUser) -> Result<MuscleGroup> {
    if user.name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty".into()));
    }
    if user.age == 0 || user.age > 130 {
        return Err(Error::Validation(format!("age {} is out of range", user.age)));
    }
    if !(user.height_cm.is_finite() && user.height_cm > 0.0) {
        return Err(Error::Validation(format!(
            "height {} cm is not a positive number",
            user.height_cm
        )));
    }
    if !(user.weight_kg.is_finite() && user.weight_kg > 0.0) {
        return Err(Error::Validation(format!(
            "weight {} kg is not a positive number",
            user.weight_kg
        )));
    }
    user.muscle_group.parse::<MuscleGroup>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::RiskLevel;

    fn temp_db() -> Database {
        let path = std::env::temp_dir().join(format!("myoguard-test-{}.sqlite3", Uuid::new_v4()));
        Database::new(path).unwrap()
    }

    fn manager() -> SessionManager {
        SessionManager::new(
            temp_db(),
            Arc::new(ClassifierRegistry::with_baselines()),
            SignalConfig::default(),
            1000.0,
        )
    }

    fn athlete() -> NewUser {
        NewUser {
            name: "Dana".into(),
            age: 27,
            height_cm: 176.0,
            weight_kg: 70.0,
            training_frequency: 4,
            fatigue_level: Some(2),
            previous_injury: Some("none".into()),
            muscle_group: "quadriceps".into(),
            contraction_type: Some("isometric".into()),
        }
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let manager = manager();
        let session_id = manager.start_session(athlete(), 30, "dev-1").await.unwrap();

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Pending);
        assert!(status.result.is_none());

        for _ in 0..3 {
            manager
                .ingest_chunk("dev-1", vec![0.1, -0.2, 0.15, -0.1, 0.05])
                .await
                .unwrap();
        }

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Collecting);

        let result = manager.end_session(&session_id, None).await.unwrap();
        assert!(matches!(
            result.risk_level,
            RiskLevel::Low | RiskLevel::Medium | RiskLevel::High
        ));
        assert!(!result.training_assignment.is_empty());

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Completed);
        assert_eq!(status.result.unwrap(), result);

        let session = manager.database().get_session(&session_id).await.unwrap().unwrap();
        assert!(session.started_at.is_some());
        assert!(session.ended_at.is_some());
    }

    #[tokio::test]
    async fn ending_without_samples_fails_the_session() {
        let manager = manager();
        let session_id = manager.start_session(athlete(), 30, "dev-2").await.unwrap();

        let err = manager.end_session(&session_id, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidSignal(_)));

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Failed);
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn second_start_supersedes_the_first() {
        let manager = manager();
        let first = manager.start_session(athlete(), 30, "dev-3").await.unwrap();
        let second = manager.start_session(athlete(), 45, "dev-3").await.unwrap();

        let first_session = manager.database().get_session(&first).await.unwrap().unwrap();
        let second_session = manager.database().get_session(&second).await.unwrap().unwrap();
        assert!(!first_session.is_active);
        assert!(second_session.is_active);

        let active = manager
            .database()
            .count_active_sessions_for_device("dev-3")
            .await
            .unwrap();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn concurrent_starts_leave_exactly_one_active() {
        let manager = manager();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.start_session(athlete(), 30, "dev-race").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let active = manager
            .database()
            .count_active_sessions_for_device("dev-race")
            .await
            .unwrap();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn end_is_not_idempotent() {
        let manager = manager();
        let session_id = manager.start_session(athlete(), 30, "dev-4").await.unwrap();
        manager
            .ingest_chunk("dev-4", vec![0.1, -0.2, 0.15])
            .await
            .unwrap();
        manager.end_session(&session_id, None).await.unwrap();

        let err = manager.end_session(&session_id, None).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_ends_resolve_to_one_winner() {
        let manager = manager();
        let session_id = manager
            .start_session(athlete(), 30, "dev-end-race")
            .await
            .unwrap();
        manager
            .ingest_chunk("dev-end-race", vec![0.1, -0.2, 0.15, -0.1, 0.05])
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let manager = manager.clone();
            let session_id = session_id.clone();
            handles.push(tokio::spawn(async move {
                manager.end_session(&session_id, None).await
            }));
        }
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        // One caller claims the session; the other observes the claimed
        // state and fails cleanly instead of processing it twice.
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(Error::Conflict(_)))));

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Completed);
        assert!(status.result.is_some());
    }

    #[tokio::test]
    async fn device_status_follows_the_active_session() {
        let manager = manager();
        assert!(manager
            .get_device_status("dev-11")
            .await
            .unwrap()
            .is_none());

        let first = manager.start_session(athlete(), 30, "dev-11").await.unwrap();
        let view = manager.get_device_status("dev-11").await.unwrap().unwrap();
        assert_eq!(view.session_id, first);
        assert_eq!(view.status, SessionStatus::Pending);

        let second = manager.start_session(athlete(), 45, "dev-11").await.unwrap();
        let view = manager.get_device_status("dev-11").await.unwrap().unwrap();
        assert_eq!(view.session_id, second);

        manager
            .ingest_chunk("dev-11", vec![0.1, -0.2, 0.15])
            .await
            .unwrap();
        manager.end_session(&second, None).await.unwrap();

        let view = manager.get_device_status("dev-11").await.unwrap().unwrap();
        assert_eq!(view.status, SessionStatus::Completed);
        assert!(view.result.is_some());
    }

    #[tokio::test]
    async fn ingest_without_active_session_is_not_found() {
        let manager = manager();
        let err = manager
            .ingest_chunk("dev-missing", vec![0.1, 0.2])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn ingest_after_end_is_not_found() {
        let manager = manager();
        let session_id = manager.start_session(athlete(), 30, "dev-5").await.unwrap();
        manager.ingest_chunk("dev-5", vec![0.1, -0.1]).await.unwrap();
        manager.end_session(&session_id, None).await.unwrap();

        let err = manager.ingest_chunk("dev-5", vec![0.2]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn chunks_read_back_in_append_order() {
        let manager = manager();
        let session_id = manager.start_session(athlete(), 30, "dev-6").await.unwrap();

        manager.ingest_chunk("dev-6", vec![1.0]).await.unwrap();
        manager.ingest_chunk("dev-6", vec![2.0, 2.5]).await.unwrap();
        manager.ingest_chunk("dev-6", vec![3.0]).await.unwrap();

        let chunks = manager
            .database()
            .get_chunks_for_session(&session_id)
            .await
            .unwrap();
        let samples: Vec<Vec<f64>> = chunks.into_iter().map(|c| c.samples).collect();
        assert_eq!(samples, vec![vec![1.0], vec![2.0, 2.5], vec![3.0]]);
    }

    #[tokio::test]
    async fn malformed_user_is_rejected_before_any_write() {
        let manager = manager();

        let unnamed = NewUser {
            name: "".into(),
            ..athlete()
        };
        assert!(matches!(
            manager.start_session(unnamed, 30, "dev-7").await.unwrap_err(),
            Error::Validation(_)
        ));

        let bad_muscle = NewUser {
            muscle_group: "deltoids".into(),
            ..athlete()
        };
        assert!(matches!(
            manager
                .start_session(bad_muscle, 30, "dev-7")
                .await
                .unwrap_err(),
            Error::Validation(_)
        ));

        let flat = NewUser {
            height_cm: 0.0,
            ..athlete()
        };
        assert!(matches!(
            manager.start_session(flat, 30, "dev-7").await.unwrap_err(),
            Error::Validation(_)
        ));

        // Nothing was written for the rejected starts.
        let active = manager
            .database()
            .count_active_sessions_for_device("dev-7")
            .await
            .unwrap();
        assert_eq!(active, 0);
    }

    #[tokio::test]
    async fn empty_chunk_is_rejected() {
        let manager = manager();
        manager.start_session(athlete(), 30, "dev-8").await.unwrap();
        let err = manager.ingest_chunk("dev-8", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn status_of_unknown_session_is_not_found() {
        let manager = manager();
        let err = manager.get_status("no-such-session").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_muscle_group_registry_fails_the_session() {
        // A registry with no quadriceps model: the pipeline error must leave
        // the session failed, not stuck in processing.
        let mut registry = ClassifierRegistry::empty();
        registry.insert(crate::prediction::ClassifierArtifact::baseline(
            MuscleGroup::Calves,
        ));
        let manager = SessionManager::new(
            temp_db(),
            Arc::new(registry),
            SignalConfig::default(),
            1000.0,
        );

        let session_id = manager.start_session(athlete(), 30, "dev-9").await.unwrap();
        manager
            .ingest_chunk("dev-9", vec![0.1, -0.2, 0.15])
            .await
            .unwrap();

        let err = manager.end_session(&session_id, None).await.unwrap_err();
        assert!(matches!(err, Error::UnknownMuscleGroup(_)));

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Failed);
    }

    #[tokio::test]
    async fn stranded_sessions_are_failed_on_recovery() {
        let manager = manager();
        let session_id = manager.start_session(athlete(), 30, "dev-10").await.unwrap();

        let recovered = manager.recover_stranded_sessions().await.unwrap();
        assert_eq!(recovered, 1);

        let status = manager.get_status(&session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Failed);
    }
}
