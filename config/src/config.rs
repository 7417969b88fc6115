//! The recognized configuration keys and their effects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Top-level configuration consumed by every CLI subcommand. Fields map
/// 1:1 onto the recognized configuration keys and their effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Cluster ids dropped before state emission, in addition to whatever
    /// CPR itself marks `excluded`.
    #[serde(default)]
    pub cluster_exclusion_set: Vec<i64>,

    #[serde(default)]
    pub progress_bin_thresholds: QuarterThresholds,

    #[serde(default)]
    pub engagement_thresholds: EngagementThresholds,

    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    #[serde(default)]
    pub learning_curve: LearningCurveChoice,

    /// Per-cluster curve parameter overrides, keyed by cluster id as a
    /// string (serde map keys must be strings). CPR is authoritative when
    /// present; this only fills gaps CPR leaves.
    #[serde(default)]
    pub curve_params: HashMap<String, ClusterCurveOverride>,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_epsilon_start")]
    pub epsilon_start: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_epsilon_end")]
    pub epsilon_end: f64,

    #[validate(range(min = 0.0))]
    #[serde(default = "default_epsilon_decay")]
    pub epsilon_decay: f64,

    #[serde(default = "default_max_episodes")]
    pub max_episodes: u32,

    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u32,

    #[validate(range(min = 0.0))]
    #[serde(default = "default_fallback_hamming_penalty")]
    pub fallback_hamming_penalty: f64,

    #[serde(default = "default_shap_background_size")]
    pub shap_background_size: usize,

    /// Fixed increment applied to a learning outcome's mastery on module
    /// completion.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_lo_mastery_increment")]
    pub lo_mastery_increment: f64,

    /// Progress floor a module must reach, together with `success == true`,
    /// before its LOs' mastery is raised.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_module_completion_threshold")]
    pub module_completion_threshold: f64,

    #[serde(default)]
    #[validate(nested)]
    pub reward: RewardConfig,

    /// Episodes averaged for the training convergence check; see DESIGN.md
    /// Open Question resolution for the chosen window.
    #[serde(default = "default_convergence_window")]
    pub convergence_window: u32,

    /// Training stops early once the moving-average reward changes by less
    /// than this over `convergence_window` further episodes.
    #[validate(range(min = 0.0))]
    #[serde(default = "default_convergence_delta")]
    pub convergence_delta: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cluster_exclusion_set: Vec::new(),
            progress_bin_thresholds: QuarterThresholds::default(),
            engagement_thresholds: EngagementThresholds::default(),
            recent_window: default_recent_window(),
            learning_curve: LearningCurveChoice::default(),
            curve_params: HashMap::new(),
            alpha: default_alpha(),
            gamma: default_gamma(),
            epsilon_start: default_epsilon_start(),
            epsilon_end: default_epsilon_end(),
            epsilon_decay: default_epsilon_decay(),
            max_episodes: default_max_episodes(),
            checkpoint_every: default_checkpoint_every(),
            fallback_hamming_penalty: default_fallback_hamming_penalty(),
            shap_background_size: default_shap_background_size(),
            lo_mastery_increment: default_lo_mastery_increment(),
            module_completion_threshold: default_module_completion_threshold(),
            reward: RewardConfig::default(),
            convergence_window: default_convergence_window(),
            convergence_delta: default_convergence_delta(),
        }
    }
}

/// Quarter-bin thresholds for progress/score quantization, defaulting to
/// `0.25/0.5/0.75/1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarterThresholds {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

impl Default for QuarterThresholds {
    fn default() -> Self {
        Self {
            q1: 0.25,
            q2: 0.5,
            q3: 0.75,
            q4: 1.0,
        }
    }
}

/// Engagement bucket thresholds, defaulting to `8,16`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementThresholds {
    pub low_medium: f64,
    pub medium_high: f64,
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self {
            low_medium: 8.0,
            medium_high: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningCurveChoice {
    #[default]
    Logistic,
    Exponential,
}

/// A file-supplied override for one cluster's curve parameters, used only
/// when CPR itself carries none for that cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterCurveOverride {
    pub rate: f64,
    pub shape: f64,
}

/// Reward-shaping coefficients. Fixed constants in a single table;
/// changing them is a policy change that bumps the artifact version.
#[derive(Debug, Clone, Copy, PartialEq, Validate, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_score_weight")]
    pub score_weight: f64,
    #[serde(default = "default_progress_weight")]
    pub progress_weight: f64,
    #[serde(default = "default_lo_bonus")]
    pub lo_bonus: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_weak_lo_threshold")]
    pub weak_lo_threshold: f64,
    #[serde(default = "default_engagement_bonus")]
    pub engagement_bonus: f64,
    #[serde(default = "default_completion_bonus")]
    pub completion_bonus: f64,
    #[serde(default = "default_invalid_action_penalty")]
    pub invalid_action_penalty: f64,
    #[serde(default = "default_mismatched_difficulty_penalty")]
    pub mismatched_difficulty_penalty: f64,
    #[serde(default = "default_stuck_penalty")]
    pub stuck_penalty: f64,
    /// The `progress_bin` floor below which `Advance` is structurally
    /// invalid, e.g. `progress_bin < 0.75`.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_advance_progress_floor")]
    pub advance_progress_floor: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            score_weight: default_score_weight(),
            progress_weight: default_progress_weight(),
            lo_bonus: default_lo_bonus(),
            weak_lo_threshold: default_weak_lo_threshold(),
            engagement_bonus: default_engagement_bonus(),
            completion_bonus: default_completion_bonus(),
            invalid_action_penalty: default_invalid_action_penalty(),
            mismatched_difficulty_penalty: default_mismatched_difficulty_penalty(),
            stuck_penalty: default_stuck_penalty(),
            advance_progress_floor: default_advance_progress_floor(),
        }
    }
}

fn default_recent_window() -> usize {
    10
}
fn default_alpha() -> f64 {
    0.1
}
fn default_gamma() -> f64 {
    0.95
}
fn default_epsilon_start() -> f64 {
    1.0
}
fn default_epsilon_end() -> f64 {
    0.05
}
fn default_epsilon_decay() -> f64 {
    0.01
}
fn default_max_episodes() -> u32 {
    10_000
}
fn default_checkpoint_every() -> u32 {
    100
}
fn default_fallback_hamming_penalty() -> f64 {
    0.5
}
fn default_shap_background_size() -> usize {
    64
}
fn default_lo_mastery_increment() -> f64 {
    0.2
}
fn default_module_completion_threshold() -> f64 {
    1.0
}
fn default_score_weight() -> f64 {
    1.0
}
fn default_progress_weight() -> f64 {
    1.0
}
fn default_lo_bonus() -> f64 {
    0.5
}
fn default_weak_lo_threshold() -> f64 {
    0.5
}
fn default_engagement_bonus() -> f64 {
    0.2
}
fn default_completion_bonus() -> f64 {
    5.0
}
fn default_invalid_action_penalty() -> f64 {
    1.0
}
fn default_mismatched_difficulty_penalty() -> f64 {
    0.5
}
fn default_stuck_penalty() -> f64 {
    2.0
}
fn default_advance_progress_floor() -> f64 {
    0.75
}
fn default_convergence_window() -> u32 {
    200
}
fn default_convergence_delta() -> f64 {
    0.01
}
