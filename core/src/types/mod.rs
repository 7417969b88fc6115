//! Shared data types for the adaptive-pathway RL core, organized along the
//! pipeline's data model.

pub mod artifact;
pub mod events;
pub mod ids;
pub mod mastery;
pub mod qtable;
pub mod recommendation;
pub mod registry;
pub mod state;
pub mod trajectory;
pub mod vocabulary;

pub use artifact::{EpsilonSchedule, LearningCurve, PolicyArtifact, PolicyMetadata};
pub use events::{LogEvent, RecentAction, UserLogSummary, RECENT_WINDOW_MAX};
pub use ids::{ClusterId, CourseId, LearnerId, LoId, ModuleId};
pub use mastery::LoMastery;
pub use qtable::QTable;
pub use recommendation::{
    Explanation, FeatureAttribution, RankedAction, Recommendation, RationaleFeature, StateFeature,
};
pub use registry::{ClusterProfile, ClusterStrength, CsrActivity, CsrModule, CurveParams};
pub use state::{Engagement, QuarterBin, State};
pub use trajectory::{TerminationReason, Trajectory, TrajectoryStep};
pub use vocabulary::{Action, ActionToken, PhaseClass, UnknownActionToken};
