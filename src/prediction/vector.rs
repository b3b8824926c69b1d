//! Feature vector assembly and schema alignment.
//!
//! Bridges the extracted EMG features and user demographics to the column
//! schema a classifier artifact expects: fixed demographic columns,
//! muscle-scoped feature names, and one-hot encoded categoricals.

use crate::prediction::classifier::MuscleGroup;
use crate::signal::EmgFeatures;

/// Demographic columns, in training order. Absent values encode as 0.
pub const DEMOGRAPHIC_COLUMNS: [&str; 6] = [
    "age",
    "height",
    "weight",
    "bmi",
    "training_frequency",
    "fatigue_level",
];

/// Category vocabulary for the `previous_injury` one-hot block.
pub const PREVIOUS_INJURY_CATEGORIES: [&str; 4] = ["calves", "hamstrings", "quadriceps", "none"];

/// Category vocabulary for the `contraction_type` one-hot block.
pub const CONTRACTION_TYPE_CATEGORIES: [&str; 3] = ["isometric", "concentric", "eccentric"];

/// An insertion-ordered named numeric vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    columns: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, replacing the value if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.columns.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Demographic and categorical inputs captured with the athlete's profile.
#[derive(Debug, Clone, Default)]
pub struct UserInputs {
    pub age: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub training_frequency: f64,
    pub fatigue_level: f64,
    pub previous_injury: String,
    pub contraction_type: String,
}

impl UserInputs {
    /// Body mass index derived from height and weight; 0 when either is
    /// missing or non-positive.
    pub fn bmi(&self) -> f64 {
        if self.height_cm > 0.0 && self.weight_kg > 0.0 {
            let height_m = self.height_cm / 100.0;
            self.weight_kg / (height_m * height_m)
        } else {
            0.0
        }
    }
}

/// Assemble the named vector for one muscle group: demographics first, then
/// muscle-scoped EMG features, then the one-hot categorical blocks.
pub fn build(inputs: &UserInputs, features: &EmgFeatures, muscle_group: MuscleGroup) -> FeatureVector {
    let mut vector = FeatureVector::new();

    vector.insert("age", inputs.age);
    vector.insert("height", inputs.height_cm);
    vector.insert("weight", inputs.weight_kg);
    vector.insert("bmi", inputs.bmi());
    vector.insert("training_frequency", inputs.training_frequency);
    vector.insert("fatigue_level", inputs.fatigue_level);

    for (name, value) in features.named() {
        vector.insert(format!("{name}_{muscle_group}"), value);
    }

    for category in PREVIOUS_INJURY_CATEGORIES {
        let hit = inputs.previous_injury == category;
        vector.insert(format!("previous_injury_{category}"), if hit { 1.0 } else { 0.0 });
    }
    for category in CONTRACTION_TYPE_CATEGORIES {
        let hit = inputs.contraction_type == category;
        vector.insert(format!("contraction_type_{category}"), if hit { 1.0 } else { 0.0 });
    }

    vector
}

/// Align a vector to a classifier's expected column list: missing columns
/// are zero-filled, surplus columns dropped, and the result reordered to
/// match `expected` exactly. An empty expectation passes the vector through
/// unchanged.
pub fn align(vector: &FeatureVector, expected: &[String]) -> FeatureVector {
    if expected.is_empty() {
        return vector.clone();
    }

    let mut aligned = FeatureVector::new();
    for name in expected {
        aligned.insert(name.clone(), vector.get(name).unwrap_or(0.0));
    }
    aligned
}
