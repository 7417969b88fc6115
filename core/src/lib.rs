//! Shared ids, data types, and trait seams for the adaptive-pathway RL
//! core: log enrichment, state construction, training, recommendation,
//! and explanation all build on the types defined here.

pub mod traits;
pub mod types;

pub use traits::{
    BatchUpsertEntry, ClusterProfileRegistry, CourseStructureRegistry, LmsClient, LmsClientError,
    ModuleProgress, StateStore, StoredState,
};
pub use types::{
    Action, ActionToken, ClusterId, ClusterProfile, ClusterStrength, CourseId, CsrActivity,
    CsrModule, CurveParams, Engagement, EpsilonSchedule, Explanation, FeatureAttribution,
    LearnerId, LearningCurve, LoId, LoMastery, LogEvent, ModuleId, PhaseClass, PolicyArtifact,
    PolicyMetadata, QTable, QuarterBin, RankedAction, RationaleFeature, RecentAction,
    Recommendation, State, StateFeature, TerminationReason, Trajectory, TrajectoryStep,
    UnknownActionToken, UserLogSummary, RECENT_WINDOW_MAX,
};
