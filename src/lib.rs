//! EMG-based muscle injury risk screening.
//!
//! A capture device streams raw surface-EMG samples into a per-device
//! session. When the session ends, the recorded signal is band-pass and
//! notch filtered, summarised into time-domain features, combined with the
//! athlete's profile into a feature vector, and classified into a risk
//! level with a matching training recommendation. Sessions, signals and
//! every derived artifact are persisted in SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod prediction;
pub mod session;
pub mod signal;

use std::sync::Arc;

use log::warn;

use config::AppConfig;
use db::Database;
use prediction::ClassifierRegistry;
use session::SessionManager;

pub use error::{Error, Result};

/// Wire up a ready-to-use [`SessionManager`] from configuration.
///
/// Opens the database (running migrations), loads classifier artifacts
/// from the models directory (falling back to the built-in baselines when
/// none are present), and fails any sessions a previous process left
/// non-terminal.
pub async fn bootstrap(config: &AppConfig) -> Result<SessionManager> {
    let db = Database::new(config.database_path.clone())?;

    let mut registry = ClassifierRegistry::load_from_dir(&config.models_dir)?;
    if registry.is_empty() {
        warn!(
            "no classifier artifacts found in {}; using built-in baselines",
            config.models_dir.display()
        );
        registry = ClassifierRegistry::with_baselines();
    }

    let manager = SessionManager::new(
        db,
        Arc::new(registry),
        config.signal_config(),
        config.default_sampling_rate_hz,
    );
    manager.recover_stranded_sessions().await?;
    Ok(manager)
}
