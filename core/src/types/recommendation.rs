//! Recommender and explainer output types.

use super::state::State;
use super::vocabulary::Action;
use serde::{Deserialize, Serialize};

/// One ranked candidate in a recommendation response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    pub action: Action,
    pub q_value: f64,
}

/// A single rationale feature surfaced alongside the chosen activity —
/// distinct from [`Explanation`]'s Shapley attribution, this is the
/// lightweight "why this activity" note the recommender produces without
/// invoking the explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationaleFeature {
    pub feature: String,
    pub detail: String,
}

/// `(action, q_value, resolved_activity_id, rationale_features)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub state: State,
    pub ranked_actions: Vec<RankedAction>,
    pub chosen_activity_id: Option<String>,
    pub rationale: Vec<RationaleFeature>,
    /// Set when the lookup fell back to the nearest state under Hamming
    /// distance; `None` means `state` was seen during training.
    pub fallback_distance: Option<u32>,
}

/// One state feature's name, used as the attribution axis in
/// [`Explanation`]. Matches the 6 `State` dimensions in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFeature {
    ClusterId,
    ModuleIdx,
    ProgressBin,
    ScoreBin,
    Phase,
    Engagement,
}

impl StateFeature {
    #[must_use]
    pub fn all() -> [StateFeature; 6] {
        [
            StateFeature::ClusterId,
            StateFeature::ModuleIdx,
            StateFeature::ProgressBin,
            StateFeature::ScoreBin,
            StateFeature::Phase,
            StateFeature::Engagement,
        ]
    }
}

/// A single signed per-feature contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: StateFeature,
    pub phi: f64,
}

/// Per-feature Shapley attribution for a `(state, action)` decision.
/// `Σ φ_i + baseline = f(state, action)`, bound to a specific
/// policy-artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub state: State,
    pub action: Action,
    pub policy_version: String,
    pub baseline: f64,
    pub attributions: Vec<FeatureAttribution>,
}

impl Explanation {
    /// `f(state, action)` reconstructed from `baseline + Σ φ_i` — the
    /// invariant attribution must satisfy within tolerance.
    #[must_use]
    pub fn reconstructed_value(&self) -> f64 {
        self.baseline + self.attributions.iter().map(|a| a.phi).sum::<f64>()
    }
}
