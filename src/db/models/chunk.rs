//! EMG chunk data model.
//!
//! One chunk is one batch of raw samples streamed from a capture device
//! during collection. Chunks are immutable once written and are read back
//! in append order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmgChunk {
    /// Rowid assigned on insert; `None` before the chunk is persisted.
    pub id: Option<i64>,
    pub session_id: String,
    pub samples: Vec<f64>,
    pub captured_at: DateTime<Utc>,
}
