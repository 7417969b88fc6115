//! Recommender: ranks actions by Q-value for a state, falling back to
//! the nearest seen state under Hamming distance, then resolves the top
//! action to a concrete activity by LO-mastery gap.

use pw_config::PipelineConfig;
use pw_core::traits::CourseStructureRegistry;
use pw_core::{
    Action, LoMastery, ModuleId, PolicyArtifact, RankedAction, RationaleFeature, Recommendation,
    State,
};
use pw_errors::RecommenderError;
use pw_observability::metrics::RECOMMEND_FALLBACK_USED;

pub struct Recommender<'a> {
    csr: &'a dyn CourseStructureRegistry,
    config: &'a PipelineConfig,
}

impl<'a> Recommender<'a> {
    pub fn new(csr: &'a dyn CourseStructureRegistry, config: &'a PipelineConfig) -> Self {
        Self { csr, config }
    }

    /// Produces a ranked, resolved recommendation for `state` against
    /// `policy`. `module_id` identifies the module `state.module_idx`
    /// belongs to, used to resolve a concrete activity for the top action.
    #[tracing::instrument(skip(self, policy, mastery), fields(module_id = module_id.value()))]
    pub fn recommend(
        &self,
        state: &State,
        policy: Option<&PolicyArtifact>,
        mastery: &LoMastery,
        module_id: ModuleId,
        top_k: usize,
    ) -> Result<Recommendation, RecommenderError> {
        let artifact = policy.ok_or(RecommenderError::PolicyMissing)?;
        if self.csr.module(module_id).is_none() {
            return Err(RecommenderError::RegistryMiss { module_id: module_id.value() });
        }

        let (row, fallback_distance) = if artifact.table.has_seen(state) {
            (artifact.table.row(state), None)
        } else {
            let nearest = nearest_seen_state(&artifact.table, state);
            metrics::counter!(RECOMMEND_FALLBACK_USED).increment(1);
            match nearest {
                Some((nearest_state, distance)) => {
                    let penalized = artifact
                        .table
                        .row(&nearest_state)
                        .into_iter()
                        .map(|(action, value)| (action, value - self.config.fallback_hamming_penalty))
                        .collect();
                    (penalized, Some(distance))
                }
                None => (Action::all().map(|a| (a, 0.0)).to_vec(), Some(u32::MAX)),
            }
        };

        let mut ranked: Vec<RankedAction> =
            row.into_iter().map(|(action, q_value)| RankedAction { action, q_value }).collect();
        ranked.sort_by(|a, b| b.q_value.partial_cmp(&a.q_value).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k.max(1));

        let top_action = ranked.first().map(|r| r.action);
        let mut rationale = Vec::new();
        let chosen_activity_id = match top_action {
            Some(action) => {
                let resolved = resolve_activity(self.csr, module_id, action, mastery, self.config.reward.weak_lo_threshold);
                if let Some((activity_id, gap)) = &resolved {
                    rationale.push(RationaleFeature {
                        feature: "lo_mastery_gap".to_string(),
                        detail: format!("resolved to {activity_id} (mastery gap {gap:.2})"),
                    });
                }
                resolved.map(|(activity_id, _)| activity_id)
            }
            None => None,
        };

        if let Some(distance) = fallback_distance {
            rationale.push(RationaleFeature {
                feature: "hamming_fallback".to_string(),
                detail: format!("nearest seen state at distance {distance}"),
            });
        }

        Ok(Recommendation {
            state: *state,
            ranked_actions: ranked,
            chosen_activity_id,
            rationale,
            fallback_distance,
        })
    }
}

/// Nearest state under Hamming distance, ties broken by lower `module_idx`
/// then higher `cluster_id` — the fallback lookup used when the exact
/// state was never visited during training.
fn nearest_seen_state(table: &pw_core::QTable, state: &State) -> Option<(State, u32)> {
    table
        .seen_states()
        .map(|candidate| (*candidate, state.hamming_distance(candidate)))
        .min_by(|(a_state, a_dist), (b_state, b_dist)| {
            a_dist
                .cmp(b_dist)
                .then_with(|| a_state.module_idx.cmp(&b_state.module_idx))
                .then_with(|| b_state.cluster_id.value().cmp(&a_state.cluster_id.value()))
        })
}

/// Among the activities CSR associates with `action` in `module_id`, picks
/// the one maximizing the summed `(threshold − mastery)` gap over its LOs
/// below `threshold`, ties broken by course ordering.
fn resolve_activity(
    csr: &dyn CourseStructureRegistry,
    module_id: ModuleId,
    action: Action,
    mastery: &LoMastery,
    threshold: f64,
) -> Option<(String, f64)> {
    csr.activities_for(module_id, action)
        .into_iter()
        .map(|activity| {
            let gap: f64 = activity
                .los
                .iter()
                .map(|lo| (threshold - mastery.mastery_of(lo)).max(0.0))
                .sum();
            (activity, gap)
        })
        .max_by(|(a_activity, a_gap), (b_activity, b_gap)| {
            a_gap
                .partial_cmp(b_gap)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b_activity.course_order.cmp(&a_activity.course_order))
        })
        .map(|(activity, gap)| (activity.activity_id.clone(), gap))
}
