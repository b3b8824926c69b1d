//! Injury-risk classification.
//!
//! Each muscle group is served by one immutable classifier artifact loaded
//! at process start. An artifact declares its expected feature columns as
//! data, so the vector builder can align any assembled vector to the exact
//! schema the model was trained on before inference runs.

use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::prediction::vector::{align, FeatureVector};

/// The fixed set of muscle groups with trained classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Calves,
    Hamstrings,
    Quadriceps,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 3] = [
        MuscleGroup::Calves,
        MuscleGroup::Hamstrings,
        MuscleGroup::Quadriceps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Calves => "calves",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Quadriceps => "quadriceps",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MuscleGroup {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "calves" => Ok(MuscleGroup::Calves),
            "hamstrings" => Ok(MuscleGroup::Hamstrings),
            "quadriceps" => Ok(MuscleGroup::Quadriceps),
            other => Err(Error::Validation(format!("unknown muscle group '{other}'"))),
        }
    }
}

/// Ordinal injury-risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<RiskLevel> {
        match value {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one inference call. The numeric score is carried for forward
/// compatibility and is currently always 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub level: RiskLevel,
    pub score: f64,
}

/// A pre-trained linear classifier for one muscle group, exported as JSON
/// by the (out-of-scope) training pipeline.
///
/// `expected_features` is the exact column schema the model was trained on.
/// An empty list means the model accepts whatever the builder produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub muscle_group: MuscleGroup,
    pub expected_features: Vec<String>,
    pub classes: Vec<RiskLevel>,
    /// One weight row per class, each as long as `expected_features`.
    pub weights: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl ClassifierArtifact {
    /// Check internal shape consistency. Run once at load time so inference
    /// never has to re-validate.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.classes.is_empty(), "artifact declares no classes");
        anyhow::ensure!(
            self.weights.len() == self.classes.len(),
            "weight rows ({}) do not match classes ({})",
            self.weights.len(),
            self.classes.len()
        );
        anyhow::ensure!(
            self.intercepts.len() == self.classes.len(),
            "intercepts ({}) do not match classes ({})",
            self.intercepts.len(),
            self.classes.len()
        );
        if !self.expected_features.is_empty() {
            for (index, row) in self.weights.iter().enumerate() {
                anyhow::ensure!(
                    row.len() == self.expected_features.len(),
                    "weight row {index} has {} entries, expected {}",
                    row.len(),
                    self.expected_features.len()
                );
            }
        }
        Ok(())
    }

    /// Score one aligned row and return the argmax class. Pure function of
    /// the input row; no shared state is touched.
    fn predict_row(&self, row: &[f64]) -> anyhow::Result<RiskLevel> {
        let mut best: Option<(f64, RiskLevel)> = None;
        for (class_index, &class) in self.classes.iter().enumerate() {
            let weights = &self.weights[class_index];
            anyhow::ensure!(
                weights.len() == row.len(),
                "aligned row has {} columns but class '{}' expects {}",
                row.len(),
                class,
                weights.len()
            );
            let score: f64 = weights
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
                + self.intercepts[class_index];
            match best {
                Some((top, _)) if score <= top => {}
                _ => best = Some((score, class)),
            }
        }
        best.map(|(_, class)| class)
            .ok_or_else(|| anyhow::anyhow!("artifact has no classes"))
    }

    /// Built-in baseline artifact: a conservative linear scorer over the
    /// standard column layout, used when no trained artifact is deployed
    /// for a muscle group.
    pub fn baseline(muscle_group: MuscleGroup) -> Self {
        use crate::prediction::vector::{
            DEMOGRAPHIC_COLUMNS, PREVIOUS_INJURY_CATEGORIES, CONTRACTION_TYPE_CATEGORIES,
        };

        // Column indices are recorded as the layout is built, so the weight
        // rows below never need a lookup.
        let mut expected: Vec<String> = Vec::new();
        let mut fatigue = 0;
        for column in DEMOGRAPHIC_COLUMNS {
            if column == "fatigue_level" {
                fatigue = expected.len();
            }
            expected.push(column.to_string());
        }
        let mut rms = 0;
        for feature in ["RMS", "MAV", "ZC", "SSC", "WL"] {
            if feature == "RMS" {
                rms = expected.len();
            }
            expected.push(format!("{feature}_{muscle_group}"));
        }
        let mut same_injury = 0;
        for category in PREVIOUS_INJURY_CATEGORIES {
            if category == muscle_group.as_str() {
                same_injury = expected.len();
            }
            expected.push(format!("previous_injury_{category}"));
        }
        for category in CONTRACTION_TYPE_CATEGORIES {
            expected.push(format!("contraction_type_{category}"));
        }

        let columns = expected.len();

        let mut low = vec![0.0; columns];
        low[rms] = -2.0;

        let mut medium = vec![0.0; columns];
        medium[rms] = 4.0;
        medium[fatigue] = 0.05;

        let mut high = vec![0.0; columns];
        high[rms] = 8.0;
        high[same_injury] = 1.0;

        Self {
            muscle_group,
            expected_features: expected,
            classes: vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::High],
            weights: vec![low, medium, high],
            intercepts: vec![1.0, 0.0, -1.0],
        }
    }
}

/// Immutable registry of one classifier per muscle group.
///
/// Constructed once at process start and shared by reference across all
/// concurrently running pipelines; never mutated or hot-reloaded afterwards.
#[derive(Debug, Default)]
pub struct ClassifierRegistry {
    models: HashMap<MuscleGroup, ClassifierArtifact>,
}

impl ClassifierRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry populated with baseline artifacts for every muscle group.
    pub fn with_baselines() -> Self {
        let mut registry = Self::empty();
        for group in MuscleGroup::ALL {
            registry.insert(ClassifierArtifact::baseline(group));
        }
        registry
    }

    /// Register an artifact under its declared muscle group. Only used
    /// while the registry is being constructed.
    pub fn insert(&mut self, artifact: ClassifierArtifact) {
        self.models.insert(artifact.muscle_group, artifact);
    }

    /// Load `model_{group}.json` for each muscle group from `dir`, skipping
    /// groups without a deployed artifact.
    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut registry = Self::empty();
        for group in MuscleGroup::ALL {
            let path = dir.join(format!("model_{group}.json"));
            if !path.exists() {
                warn!("no classifier artifact at {}", path.display());
                continue;
            }
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read artifact {}", path.display()))?;
            let artifact: ClassifierArtifact = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse artifact {}", path.display()))?;
            artifact
                .validate()
                .with_context(|| format!("invalid artifact {}", path.display()))?;
            anyhow::ensure!(
                artifact.muscle_group == group,
                "artifact {} declares muscle group '{}'",
                path.display(),
                artifact.muscle_group
            );
            info!("loaded classifier artifact for {group}");
            registry.insert(artifact);
        }
        Ok(registry)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Align the assembled vector to the artifact's declared schema and run
    /// inference.
    ///
    /// Fails with [`Error::UnknownMuscleGroup`] when no classifier is
    /// registered for `group`.
    pub fn predict(&self, vector: &FeatureVector, group: MuscleGroup) -> Result<Prediction> {
        let artifact = self
            .models
            .get(&group)
            .ok_or_else(|| Error::UnknownMuscleGroup(group.as_str().to_string()))?;

        let aligned = align(vector, &artifact.expected_features);
        let level = artifact
            .predict_row(&aligned.values())
            .map_err(Error::Internal)?;

        Ok(Prediction { level, score: 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_with(rms: f64) -> FeatureVector {
        let mut vector = FeatureVector::new();
        vector.insert("RMS_quadriceps", rms);
        vector
    }

    #[test]
    fn unregistered_group_is_rejected() {
        let registry = ClassifierRegistry::empty();
        let err = registry
            .predict(&vector_with(0.1), MuscleGroup::Quadriceps)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMuscleGroup(ref g) if g == "quadriceps"));
    }

    #[test]
    fn baseline_predicts_low_for_quiet_signal() {
        let registry = ClassifierRegistry::with_baselines();
        let prediction = registry
            .predict(&vector_with(0.01), MuscleGroup::Quadriceps)
            .unwrap();
        assert_eq!(prediction.level, RiskLevel::Low);
        assert_eq!(prediction.score, 0.0);
    }

    #[test]
    fn baseline_predicts_high_for_strong_signal() {
        let registry = ClassifierRegistry::with_baselines();
        let prediction = registry
            .predict(&vector_with(2.0), MuscleGroup::Quadriceps)
            .unwrap();
        assert_eq!(prediction.level, RiskLevel::High);
    }

    #[test]
    fn prediction_is_deterministic() {
        let registry = ClassifierRegistry::with_baselines();
        let first = registry.predict(&vector_with(0.4), MuscleGroup::Calves).unwrap();
        let second = registry.predict(&vector_with(0.4), MuscleGroup::Calves).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn artifact_round_trips_through_json() {
        let artifact = ClassifierArtifact::baseline(MuscleGroup::Hamstrings);
        let json = serde_json::to_string(&artifact).unwrap();
        let parsed: ClassifierArtifact = serde_json::from_str(&json).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.muscle_group, MuscleGroup::Hamstrings);
        assert_eq!(parsed.expected_features, artifact.expected_features);
    }

    #[test]
    fn baseline_weights_target_the_named_columns() {
        for group in MuscleGroup::ALL {
            let artifact = ClassifierArtifact::baseline(group);
            let index_of = |name: String| {
                artifact
                    .expected_features
                    .iter()
                    .position(|c| *c == name)
                    .unwrap()
            };
            let rms = index_of(format!("RMS_{group}"));
            let fatigue = index_of("fatigue_level".to_string());
            let same_injury = index_of(format!("previous_injury_{group}"));

            assert_eq!(artifact.weights[0][rms], -2.0);
            assert_eq!(artifact.weights[1][rms], 4.0);
            assert_eq!(artifact.weights[1][fatigue], 0.05);
            assert_eq!(artifact.weights[2][rms], 8.0);
            assert_eq!(artifact.weights[2][same_injury], 1.0);
        }
    }

    #[test]
    fn artifact_with_mismatched_weights_fails_validation() {
        let mut artifact = ClassifierArtifact::baseline(MuscleGroup::Calves);
        artifact.weights.pop();
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn muscle_group_parses_and_displays() {
        assert_eq!("hamstrings".parse::<MuscleGroup>().unwrap(), MuscleGroup::Hamstrings);
        assert!(matches!(
            "deltoids".parse::<MuscleGroup>().unwrap_err(),
            Error::Validation(_)
        ));
        assert_eq!(MuscleGroup::Calves.to_string(), "calves");
    }
}
