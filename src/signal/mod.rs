//! EMG signal conditioning and feature extraction.
//!
//! The pipeline applied to one concatenated raw session signal:
//!
//! ```text
//! Raw samples
//!   -> Butterworth band-pass, 5th order, 20-450 Hz
//!   -> Notch at the mains frequency, Q = 30
//!   -> Time-domain features (RMS, MAV, ZC, SSC, WL)
//! ```

pub mod features;
pub mod filter;

pub use features::EmgFeatures;
pub use filter::FilterChain;

use crate::error::{Error, Result};

/// Parameters of the filtering stage.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub bandpass_low_hz: f64,
    pub bandpass_high_hz: f64,
    pub notch_hz: f64,
    pub notch_q: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: 20.0,
            bandpass_high_hz: 450.0,
            notch_hz: 50.0,
            notch_q: 30.0,
        }
    }
}

const BANDPASS_ORDER: usize = 5;

/// Filter a raw EMG signal and extract the fixed feature set.
///
/// Fails with [`Error::InvalidSignal`] when the signal is empty or the
/// filter design is infeasible for `sampling_rate_hz` (cutoff at or above
/// Nyquist).
pub fn extract(raw_signal: &[f64], sampling_rate_hz: f64, config: &SignalConfig) -> Result<EmgFeatures> {
    if raw_signal.is_empty() {
        return Err(Error::InvalidSignal("raw signal is empty".into()));
    }
    if !sampling_rate_hz.is_finite() || sampling_rate_hz <= 0.0 {
        return Err(Error::InvalidSignal(format!(
            "sampling rate {sampling_rate_hz} Hz is not usable"
        )));
    }

    let mut bandpass = FilterChain::butterworth_bandpass(
        BANDPASS_ORDER,
        config.bandpass_low_hz,
        config.bandpass_high_hz,
        sampling_rate_hz,
    )?;
    let mut notch = FilterChain::notch(config.notch_hz, config.notch_q, sampling_rate_hz)?;

    let filtered = notch.apply(&bandpass.apply(raw_signal));

    Ok(features::compute_all(&filtered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_signal_is_rejected() {
        let err = extract(&[], 1000.0, &SignalConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidSignal(_)));
    }

    #[test]
    fn infeasible_sampling_rate_is_rejected() {
        // Nyquist is 250 Hz, below the 450 Hz upper cutoff.
        let err = extract(&[0.1, 0.2, 0.3], 500.0, &SignalConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidSignal(_)));
    }

    #[test]
    fn all_zero_signal_yields_all_zero_features() {
        let features = extract(&vec![0.0; 512], 1000.0, &SignalConfig::default()).unwrap();
        assert_eq!(features.rms, 0.0);
        assert_eq!(features.mav, 0.0);
        assert_eq!(features.zero_crossings, 0.0);
        assert_eq!(features.slope_sign_changes, 0.0);
        assert_eq!(features.waveform_length, 0.0);
    }

    #[test]
    fn broadband_signal_yields_positive_features() {
        // A 100 Hz tone sits inside the pass band.
        let signal: Vec<f64> = (0..2000)
            .map(|i| (2.0 * std::f64::consts::PI * 100.0 * i as f64 / 1000.0).sin())
            .collect();
        let features = extract(&signal, 1000.0, &SignalConfig::default()).unwrap();
        assert!(features.rms > 0.1);
        assert!(features.mav > 0.1);
        assert!(features.zero_crossings > 0.0);
        assert!(features.waveform_length > 0.0);
    }

    #[test]
    fn extraction_is_deterministic() {
        let signal = vec![0.1, -0.2, 0.15, -0.1, 0.05];
        let config = SignalConfig::default();
        let first = extract(&signal, 1000.0, &config).unwrap();
        let second = extract(&signal, 1000.0, &config).unwrap();
        assert_eq!(first, second);
    }
}
