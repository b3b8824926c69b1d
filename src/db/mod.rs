//! Persistence layer: a worker-thread SQLite connection, versioned
//! migrations, entity models and their repositories.

pub mod connection;
pub mod helpers;
pub mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use models::{
    EmgChunk, FeatureSet, ProcessingClaim, RiskScore, Session, SessionResult, SessionStatus,
    TrainingAssignment, UserProfile,
};
