//! Derived artifacts persisted when a session completes.
//!
//! Each session owns at most one derivation chain:
//! FeatureSet -> RiskScore -> TrainingAssignment. The chain is append-only
//! and never reused across sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prediction::RiskLevel;
use crate::signal::EmgFeatures;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    pub id: String,
    pub session_id: String,
    pub features: EmgFeatures,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScore {
    pub id: String,
    pub feature_set_id: String,
    /// Numeric score, currently always 0.
    pub score: f64,
    pub level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingAssignment {
    pub id: String,
    pub risk_score_id: String,
    pub assignment: String,
    pub created_at: DateTime<Utc>,
}

/// The completed-session result surfaced by status reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub risk_level: RiskLevel,
    pub training_assignment: String,
}
