//! Session data model and lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a capture session.
///
/// ```text
/// pending -> collecting -> processing -> completed
///        \_____________\______________-> failed
/// ```
///
/// `completed` and `failed` are terminal; `processing` only ever moves to
/// one of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Collecting,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Collecting => "collecting",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    /// Whether `end_session` may still claim this session.
    pub fn can_end(&self) -> bool {
        matches!(self, SessionStatus::Pending | SessionStatus::Collecting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    /// Intended session length in seconds.
    pub duration_secs: u64,
    pub status: SessionStatus,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of atomically claiming a session for processing.
#[derive(Debug, Clone)]
pub enum ProcessingClaim {
    /// The session was in an endable state and is now `processing`.
    Claimed(Session),
    /// No session with that id exists.
    Missing,
    /// The session exists but is not in `{pending, collecting}`.
    Ineligible(SessionStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_collecting_can_end() {
        assert!(SessionStatus::Pending.can_end());
        assert!(SessionStatus::Collecting.can_end());
        assert!(!SessionStatus::Processing.can_end());
        assert!(!SessionStatus::Completed.can_end());
        assert!(!SessionStatus::Failed.can_end());
    }

    #[test]
    fn terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Processing.is_terminal());
    }
}
