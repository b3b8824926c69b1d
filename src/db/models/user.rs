//! Athlete profile captured when a session starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prediction::{MuscleGroup, UserInputs};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub age: u32,
    /// Height in cm.
    pub height_cm: f64,
    /// Weight in kg.
    pub weight_kg: f64,
    /// Training sessions per week.
    pub training_frequency: u32,
    /// Self-reported fatigue, absent when not collected.
    pub fatigue_level: Option<u32>,
    /// Free-form category; values outside the training vocabulary one-hot
    /// encode to all zeros.
    pub previous_injury: String,
    pub muscle_group: MuscleGroup,
    pub contraction_type: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Demographic and categorical inputs in the form the vector builder
    /// consumes.
    pub fn inputs(&self) -> UserInputs {
        UserInputs {
            age: f64::from(self.age),
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            training_frequency: f64::from(self.training_frequency),
            fatigue_level: self.fatigue_level.map(f64::from).unwrap_or(0.0),
            previous_injury: self.previous_injury.clone(),
            contraction_type: self.contraction_type.clone(),
        }
    }
}
