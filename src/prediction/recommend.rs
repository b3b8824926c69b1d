//! Training recommendation table.
//!
//! A pure, table-driven mapping from risk level to regimen text. No state,
//! no side effects: the same level always yields byte-identical text.

use crate::prediction::classifier::RiskLevel;

/// Sentinel returned when a persisted level cannot be interpreted.
pub const NO_RECOMMENDATION: &str = "No recommendation available.";

const LOW_RISK_REGIME: &str = "Low Risk Training Regime:\n\
- Continue regular strength and conditioning.\n\
- Emphasize warm-up, cool-down, and recovery.\n\
- Monitor training load.\n\
- Dynamic warm-up, plyometrics, activation exercises before practice.\n\
- Full participation in team drills.\n\
- Static stretching, foam rolling, hydration after practice.";

const MEDIUM_RISK_REGIME: &str = "Medium Risk Training Regime:\n\
- Add targeted neuromuscular and eccentric strengthening.\n\
- Monitor fatigue and muscle imbalances.\n\
- Integrate recovery modalities.\n\
- Dynamic warm-up with balance/proprioceptive drills.\n\
- Eccentric strengthening, neuromuscular exercises during practice.\n\
- Static stretching, yoga, foam rolling, ice/compression after practice.";

const HIGH_RISK_REGIME: &str = "High Risk Training Regime:\n\
- Supervised rehabilitation with a physiotherapist.\n\
- Individualized corrective exercise program.\n\
- Gradual return-to-play protocol.\n\
- Supervised rehab warm-up, corrective exercises before practice.\n\
- Modified/limited participation in team drills.\n\
- Extended cool-down, physiotherapist-guided recovery, education after practice.";

/// The regimen text for a classified risk level.
pub fn recommend(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => LOW_RISK_REGIME,
        RiskLevel::Medium => MEDIUM_RISK_REGIME,
        RiskLevel::High => HIGH_RISK_REGIME,
    }
}

/// Variant taking a stored level label; unknown labels fall back to the
/// sentinel rather than failing.
pub fn recommend_for_label(label: &str) -> &'static str {
    match RiskLevel::parse(label) {
        Some(level) => recommend(level),
        None => NO_RECOMMENDATION,
    }
}
