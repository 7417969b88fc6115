//! CSR/CPR artifact shapes. Loading and caching live in the `pw-csr`
//! and `pw-cpr` crates; these are the shared wire/in-memory types both the
//! loaders and every consumer agree on.

use super::ids::{ClusterId, CourseId, LoId, ModuleId};
use super::vocabulary::Action;
use serde::{Deserialize, Serialize};

/// One module entry in the Course Structure Registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrModule {
    pub id: ModuleId,
    pub index: u32,
    pub course_id: CourseId,
    pub section_id: u32,
    pub activity_type: String,
    pub los: Vec<LoId>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// A concrete activity CSR associates with an action inside a module —
/// the unit the recommender's activity resolution chooses among.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrActivity {
    pub activity_id: String,
    pub module_id: ModuleId,
    pub action: Action,
    pub los: Vec<LoId>,
    /// Position within the course, used to break resolution ties by
    /// course ordering.
    pub course_order: u32,
}

/// Whether a behavioral cluster is weak, medium, or strong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrength {
    Weak,
    Medium,
    Strong,
}

/// One cluster's calibration and behavior profile, as carried in the CPR
/// artifact and consumed by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub id: ClusterId,
    pub label: String,
    pub excluded: bool,
    pub score_mean: f64,
    pub stuck_prob: f64,
    pub preferred_actions: Vec<Action>,
    pub strength: ClusterStrength,
    pub curve_params: CurveParams,
}

/// Per-cluster learning-curve and score-range calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub curve: super::artifact::LearningCurve,
    /// Logistic steepness `k`, or exponential rate `b` depending on `curve`.
    pub rate: f64,
    /// Logistic midpoint `x0`, or exponential asymptote `a` depending on
    /// `curve`.
    pub shape: f64,
    pub score_min: f64,
    pub score_max: f64,
    pub base_success_rate: f64,
    pub exploration_entropy: f64,
}
