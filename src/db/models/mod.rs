pub mod chunk;
pub mod result;
pub mod session;
pub mod user;

pub use chunk::EmgChunk;
pub use result::{FeatureSet, RiskScore, SessionResult, TrainingAssignment};
pub use session::{ProcessingClaim, Session, SessionStatus};
pub use user::UserProfile;
