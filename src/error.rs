//! Error types for the myoguard engine.
//!
//! Errors raised before any state mutation (`Validation`, `NotFound`,
//! `Conflict`) are caller-recoverable and leave no trace in the store.
//! Pipeline errors (`InvalidSignal`, `UnknownMuscleGroup`) and internal
//! storage errors drive the owning session to the `failed` state instead of
//! leaving it stuck in `processing`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("no classifier registered for muscle group '{0}'")]
    UnknownMuscleGroup(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error is a pipeline-level failure that must transition
    /// the owning session to `failed`.
    pub fn fails_session(&self) -> bool {
        matches!(
            self,
            Error::InvalidSignal(_) | Error::UnknownMuscleGroup(_) | Error::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_fail_the_session() {
        assert!(Error::InvalidSignal("empty".into()).fails_session());
        assert!(Error::UnknownMuscleGroup("deltoids".into()).fails_session());
        assert!(Error::Internal(anyhow::anyhow!("db gone")).fails_session());
    }

    #[test]
    fn caller_errors_do_not_fail_the_session() {
        assert!(!Error::Validation("missing name".into()).fails_session());
        assert!(!Error::NotFound("session x".into()).fails_session());
        assert!(!Error::Conflict("already completed".into()).fails_session());
    }
}
