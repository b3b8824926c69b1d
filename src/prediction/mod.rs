//! Risk prediction: feature vector assembly, classification, and the
//! training recommendation table.

pub mod classifier;
pub mod recommend;
pub mod vector;

pub use classifier::{ClassifierArtifact, ClassifierRegistry, MuscleGroup, Prediction, RiskLevel};
pub use recommend::{recommend, recommend_for_label, NO_RECOMMENDATION};
pub use vector::{align, build, FeatureVector, UserInputs};
