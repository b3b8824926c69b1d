use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::signal::SignalConfig;

/// Application configuration, loaded from a JSON file at startup.
///
/// Missing file or unreadable contents fall back to defaults so a fresh
/// install works without any setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the SQLite database lives.
    pub database_path: PathBuf,
    /// Directory holding one classifier artifact JSON per muscle group.
    pub models_dir: PathBuf,
    /// Mains interference frequency removed by the notch filter (50 or 60 Hz
    /// depending on deployment region).
    pub mains_hz: f64,
    /// Sampling rate assumed when the caller does not supply one.
    pub default_sampling_rate_hz: f64,
    /// Band-pass lower cutoff for the physiological EMG band.
    pub bandpass_low_hz: f64,
    /// Band-pass upper cutoff for the physiological EMG band.
    pub bandpass_high_hz: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("myoguard.sqlite3"),
            models_dir: PathBuf::from("models"),
            mains_hz: 50.0,
            default_sampling_rate_hz: 1000.0,
            bandpass_low_hz: 20.0,
            bandpass_high_hz: 450.0,
        }
    }
}

impl AppConfig {
    pub fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    /// Signal-processing parameters derived from this configuration.
    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            bandpass_low_hz: self.bandpass_low_hz,
            bandpass_high_hz: self.bandpass_high_hz,
            notch_hz: self.mains_hz,
            notch_q: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(&PathBuf::from("/nonexistent/myoguard.json")).unwrap();
        assert_eq!(config.mains_hz, 50.0);
        assert_eq!(config.default_sampling_rate_hz, 1000.0);
    }

    #[test]
    fn signal_config_carries_band_edges() {
        let config = AppConfig::default();
        let signal = config.signal_config();
        assert_eq!(signal.bandpass_low_hz, 20.0);
        assert_eq!(signal.bandpass_high_hz, 450.0);
        assert_eq!(signal.notch_q, 30.0);
    }
}
