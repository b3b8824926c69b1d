//! Time-domain EMG features.
//!
//! The five standard scalars computed over a filtered signal window:
//! root-mean-square, mean absolute value, zero-crossing count, slope-sign
//! change count, and waveform length.

use serde::{Deserialize, Serialize};

/// The fixed feature set extracted from one filtered EMG signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmgFeatures {
    #[serde(rename = "RMS")]
    pub rms: f64,
    #[serde(rename = "MAV")]
    pub mav: f64,
    #[serde(rename = "ZC")]
    pub zero_crossings: f64,
    #[serde(rename = "SSC")]
    pub slope_sign_changes: f64,
    #[serde(rename = "WL")]
    pub waveform_length: f64,
}

impl EmgFeatures {
    /// Canonical column names paired with values, in stable order. The
    /// muscle-scoped renaming applied by the vector builder appends the
    /// muscle group to each of these names.
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("RMS", self.rms),
            ("MAV", self.mav),
            ("ZC", self.zero_crossings),
            ("SSC", self.slope_sign_changes),
            ("WL", self.waveform_length),
        ]
    }
}

/// Compute all five features over a filtered signal.
pub fn compute_all(signal: &[f64]) -> EmgFeatures {
    EmgFeatures {
        rms: compute_rms(signal),
        mav: compute_mav(signal),
        zero_crossings: count_zero_crossings(signal) as f64,
        slope_sign_changes: count_slope_sign_changes(signal) as f64,
        waveform_length: compute_waveform_length(signal),
    }
}

/// Root-mean-square. Returns 0.0 for an empty signal.
pub fn compute_rms(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|&x| x * x).sum();
    (sum_sq / signal.len() as f64).sqrt()
}

/// Mean absolute value. Returns 0.0 for an empty signal.
pub fn compute_mav(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|x| x.abs()).sum::<f64>() / signal.len() as f64
}

/// Ternary sign: -1, 0 or +1. `f64::signum` maps 0.0 to 1.0, which would
/// miscount transitions through exact zero samples.
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Count sign changes between consecutive samples, zero samples included.
pub fn count_zero_crossings(signal: &[f64]) -> usize {
    signal
        .windows(2)
        .filter(|w| sign(w[0]) != sign(w[1]))
        .count()
}

/// Count sign changes between consecutive first differences.
pub fn count_slope_sign_changes(signal: &[f64]) -> usize {
    if signal.len() < 3 {
        return 0;
    }
    (1..signal.len() - 1)
        .filter(|&i| {
            let d_prev = signal[i] - signal[i - 1];
            let d_next = signal[i + 1] - signal[i];
            sign(d_prev) != sign(d_next)
        })
        .count()
}

/// Waveform length: cumulative absolute first difference.
pub fn compute_waveform_length(signal: &[f64]) -> f64 {
    signal.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}
