//! Explainer: permutation-sampled Shapley attribution of a trained
//! Q-function's output over the 6 state features, for a chosen
//! `(state, action)` pair against a background sample of observed states.
//!
//! This follows the standard permutation-SHAP estimator (Štrumbelj &
//! Kononenko), picked because it gives the `Σφ_i + baseline = f(s,a*)`
//! invariant exactly for any sample count ≥ 1, rather than only in the
//! limit. See DESIGN.md.

use pw_config::PipelineConfig;
use pw_core::{
    Action, ClusterId, Explanation, FeatureAttribution, PolicyArtifact, State, StateFeature,
};
use pw_errors::ExplainerError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Permutations sampled per background state. Six features admit only 720
/// distinct orderings; this is a small bounded budget, not an attempt to
/// cover them all.
const PERMUTATIONS_PER_BACKGROUND: usize = 8;

pub struct Explainer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Explainer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Computes `φ_i(state)` for the 6 state features with respect to
    /// `f(·, action) = Q(·, action)`, against `background` (truncated to
    /// `config.shap_background_size`). `expected_policy_version`, when
    /// given, must match the artifact's version or the call is rejected
    ///.
    #[tracing::instrument(skip(self, policy, background), fields(action = ?action, background_len = background.len()))]
    pub fn explain(
        &self,
        state: &State,
        action: Action,
        policy: Option<&PolicyArtifact>,
        background: &[State],
        expected_policy_version: Option<&str>,
        seed: u64,
    ) -> Result<Explanation, ExplainerError> {
        let artifact = policy.ok_or(ExplainerError::PolicyMissing)?;
        if let Some(expected) = expected_policy_version {
            if expected != artifact.version() {
                return Err(ExplainerError::VersionMismatch {
                    expected: expected.to_string(),
                    actual: artifact.version().to_string(),
                });
            }
        }
        if background.is_empty() {
            return Err(ExplainerError::Numerical { reason: "empty background sample".to_string() });
        }

        let bound = self.config.shap_background_size.max(1);
        let sample: Vec<State> = background.iter().take(bound).copied().collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut phi = [0.0_f64; 6];
        let mut baseline_acc = 0.0_f64;
        let mut order = [0usize, 1, 2, 3, 4, 5];

        for bg in &sample {
            let baseline_value = artifact.table.get(bg, action);
            baseline_acc += baseline_value;
            if !baseline_value.is_finite() {
                return Err(ExplainerError::Numerical { reason: "non-finite baseline Q-value".to_string() });
            }

            for _ in 0..PERMUTATIONS_PER_BACKGROUND {
                order.shuffle(&mut rng);
                let mut mask = [false; 6];
                let mut current = compose(state, bg, mask);
                let mut current_value = artifact.table.get(&current, action);
                for &feature_idx in &order {
                    mask[feature_idx] = true;
                    let next = compose(state, bg, mask);
                    let next_value = artifact.table.get(&next, action);
                    if !next_value.is_finite() {
                        return Err(ExplainerError::Numerical { reason: "non-finite Q-value during attribution".to_string() });
                    }
                    phi[feature_idx] += next_value - current_value;
                    current = next;
                    current_value = next_value;
                }
            }
        }

        let denom = (sample.len() * PERMUTATIONS_PER_BACKGROUND) as f64;
        let baseline = baseline_acc / sample.len() as f64;
        let attributions: Vec<FeatureAttribution> = StateFeature::all()
            .into_iter()
            .enumerate()
            .map(|(idx, feature)| FeatureAttribution { feature, phi: phi[idx] / denom })
            .collect();

        Ok(Explanation {
            state: *state,
            action,
            policy_version: artifact.version().to_string(),
            baseline,
            attributions,
        })
    }
}

fn compose(target: &State, background: &State, mask: [bool; 6]) -> State {
    State {
        cluster_id: if mask[0] { target.cluster_id } else { background.cluster_id },
        module_idx: if mask[1] { target.module_idx } else { background.module_idx },
        progress_bin: if mask[2] { target.progress_bin } else { background.progress_bin },
        score_bin: if mask[3] { target.score_bin } else { background.score_bin },
        phase: if mask[4] { target.phase } else { background.phase },
        engagement: if mask[5] { target.engagement } else { background.engagement },
    }
}

/// One feature's mean absolute attribution over a set of explanations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMeanAbs {
    pub feature: StateFeature,
    pub mean_abs_phi: f64,
}

/// Per-cluster mean|φ| breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBreakdown {
    pub cluster_id: ClusterId,
    pub features: Vec<FeatureMeanAbs>,
}

/// Per-action top-attributed features.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionFeatures {
    pub action: Action,
    pub features: Vec<FeatureMeanAbs>,
}

/// Aggregate reporting outputs over a batch of explanations. Pure
/// function over already-computed explanations; no PII crosses this
/// boundary since `State` carries no learner identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionSummary {
    pub overall: Vec<FeatureMeanAbs>,
    pub per_cluster: Vec<ClusterBreakdown>,
    pub per_action: Vec<ActionFeatures>,
}

#[must_use]
pub fn aggregate(explanations: &[Explanation]) -> AttributionSummary {
    let overall = mean_abs_by_feature(explanations.iter());

    let mut cluster_ids: Vec<ClusterId> = explanations.iter().map(|e| e.state.cluster_id).collect();
    cluster_ids.sort_by_key(|c| c.value());
    cluster_ids.dedup();
    let per_cluster = cluster_ids
        .into_iter()
        .map(|cluster_id| ClusterBreakdown {
            cluster_id,
            features: mean_abs_by_feature(explanations.iter().filter(|e| e.state.cluster_id == cluster_id)),
        })
        .collect();

    let mut actions: Vec<Action> = explanations.iter().map(|e| e.action).collect();
    actions.sort_by_key(|a| format!("{a:?}"));
    actions.dedup();
    let per_action = actions
        .into_iter()
        .map(|action| {
            let mut features = mean_abs_by_feature(explanations.iter().filter(|e| e.action == action));
            features.sort_by(|a, b| b.mean_abs_phi.partial_cmp(&a.mean_abs_phi).unwrap_or(std::cmp::Ordering::Equal));
            ActionFeatures { action, features }
        })
        .collect();

    AttributionSummary { overall, per_cluster, per_action }
}

fn mean_abs_by_feature<'a>(explanations: impl Iterator<Item = &'a Explanation> + Clone) -> Vec<FeatureMeanAbs> {
    StateFeature::all()
        .into_iter()
        .map(|feature| {
            let values: Vec<f64> = explanations
                .clone()
                .filter_map(|e| e.attributions.iter().find(|a| a.feature == feature).map(|a| a.phi.abs()))
                .collect();
            let mean_abs_phi = if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 };
            FeatureMeanAbs { feature, mean_abs_phi }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::{Engagement, EpsilonSchedule, PhaseClass, PolicyMetadata, QTable, QuarterBin};

    fn state(cluster: i64, module_idx: u32) -> State {
        State {
            cluster_id: ClusterId::new(cluster),
            module_idx,
            progress_bin: QuarterBin::Q50,
            score_bin: QuarterBin::Q25,
            phase: PhaseClass::Active,
            engagement: Engagement::Low,
        }
    }

    fn artifact(table: QTable) -> PolicyArtifact {
        PolicyArtifact::commit(
            table,
            PolicyMetadata {
                version: "v1".to_string(),
                episodes: 1,
                alpha: 0.1,
                gamma: 0.95,
                epsilon_schedule: EpsilonSchedule { start: 1.0, end: 0.05, decay: 0.01 },
                seed: 1,
                simulator_params_hash: "h".to_string(),
                csr_hash: "h".to_string(),
                cpr_hash: "h".to_string(),
            },
        )
    }

    fn sample_table() -> QTable {
        let mut table = QTable::new();
        for cluster in 0..2 {
            for module_idx in 0..2 {
                table.set(state(cluster, module_idx), Action::AttemptQuiz, f64::from(cluster * 2 + module_idx as i64));
            }
        }
        table
    }

    #[test]
    fn attribution_sums_to_q_value_within_tolerance() {
        let config = PipelineConfig::default();
        let table = sample_table();
        let target = state(1, 1);
        let expected = table.get(&target, Action::AttemptQuiz);
        let artifact = artifact(table);
        let background = vec![state(0, 0), state(0, 1), state(1, 0)];

        let explainer = Explainer::new(&config);
        let explanation = explainer.explain(&target, Action::AttemptQuiz, Some(&artifact), &background, None, 7).unwrap();

        assert!((explanation.reconstructed_value() - expected).abs() < 1e-9);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let config = PipelineConfig::default();
        let artifact = artifact(sample_table());
        let background = vec![state(0, 0)];
        let explainer = Explainer::new(&config);
        let result = explainer.explain(&state(1, 1), Action::AttemptQuiz, Some(&artifact), &background, Some("stale-version"), 1);
        assert!(matches!(result, Err(ExplainerError::VersionMismatch { .. })));
    }

    #[test]
    fn missing_policy_is_rejected() {
        let config = PipelineConfig::default();
        let explainer = Explainer::new(&config);
        let background = vec![state(0, 0)];
        let result = explainer.explain(&state(1, 1), Action::AttemptQuiz, None, &background, None, 1);
        assert!(matches!(result, Err(ExplainerError::PolicyMissing)));
    }

    #[test]
    fn empty_background_is_rejected() {
        let config = PipelineConfig::default();
        let artifact = artifact(sample_table());
        let explainer = Explainer::new(&config);
        let result = explainer.explain(&state(1, 1), Action::AttemptQuiz, Some(&artifact), &[], None, 1);
        assert!(matches!(result, Err(ExplainerError::Numerical { .. })));
    }

    #[test]
    fn aggregate_computes_mean_absolute_attribution_per_feature() {
        let config = PipelineConfig::default();
        let table = sample_table();
        let artifact = artifact(table);
        let background = vec![state(0, 0), state(0, 1)];
        let explainer = Explainer::new(&config);

        let e1 = explainer.explain(&state(1, 1), Action::AttemptQuiz, Some(&artifact), &background, None, 1).unwrap();
        let e2 = explainer.explain(&state(1, 0), Action::AttemptQuiz, Some(&artifact), &background, None, 2).unwrap();

        let summary = aggregate(&[e1, e2]);
        assert_eq!(summary.overall.len(), 6);
        assert_eq!(summary.per_action.len(), 1);
        assert!(summary.per_cluster.iter().any(|c| c.cluster_id == ClusterId::new(1)));
    }
}
