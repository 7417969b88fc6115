//! State Builder: turns a [`UserLogSummary`] plus the CSR/CPR
//! registries into a 6-D [`State`], and folds completed-module events into
//! [`LoMastery`].

use pw_config::PipelineConfig;
use pw_core::traits::{ClusterProfileRegistry, CourseStructureRegistry};
use pw_core::{
    ClusterId, Engagement, LearnerId, LoMastery, LogEvent, ModuleId, PhaseClass, QuarterBin,
    State, UserLogSummary,
};

/// Why [`build_state`] produced no state — used only for `tracing`/metrics
/// context, never surfaced across the pipeline boundary as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    LearnerUnknownToCpr,
    ClusterExcluded,
    ModuleUnknownToCsr,
    NoActivity,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::LearnerUnknownToCpr => "learner_unknown_to_cpr",
            SkipReason::ClusterExcluded => "cluster_excluded",
            SkipReason::ModuleUnknownToCsr => "module_unknown_to_csr",
            SkipReason::NoActivity => "no_activity",
        };
        write!(f, "{s}")
    }
}

/// Builds the 6-D state for one `(learner, module)` summary, or `None` if
/// the input doesn't warrant emitting a state.
#[tracing::instrument(skip(summary, csr, cpr, config), fields(learner_id = learner_id.value(), module_id = summary.module_id.value()))]
pub fn build_state(
    summary: &UserLogSummary,
    learner_id: LearnerId,
    csr: &dyn CourseStructureRegistry,
    cpr: &dyn ClusterProfileRegistry,
    config: &PipelineConfig,
) -> Option<State> {
    let Some(cluster_id) = cpr.cluster_of(learner_id) else {
        record_skip(SkipReason::LearnerUnknownToCpr);
        return None;
    };
    if cpr.is_excluded(cluster_id) || config.cluster_exclusion_set.contains(&cluster_id.value()) {
        record_skip(SkipReason::ClusterExcluded);
        return None;
    }

    let Some(module_idx) = csr.module_index(summary.module_id) else {
        record_skip(SkipReason::ModuleUnknownToCsr);
        return None;
    };

    let thresholds = &config.progress_bin_thresholds;
    let progress_bin = match QuarterBin::quantize_with(
        summary.progress,
        thresholds.q1,
        thresholds.q2,
        thresholds.q3,
    ) {
        Some(bin) => bin,
        None if has_real_activity(summary) => QuarterBin::Q25,
        None => {
            record_skip(SkipReason::NoActivity);
            return None;
        }
    };

    let score_bin = QuarterBin::quantize_with(
        summary.avg_score,
        thresholds.q1,
        thresholds.q2,
        thresholds.q3,
    )
    .unwrap_or(QuarterBin::Q25);

    let phase = compute_phase(summary);
    let engagement = compute_engagement(summary, &config.engagement_thresholds);

    metrics::counter!(pw_observability::metrics::STATES_BUILT).increment(1);
    Some(State {
        cluster_id,
        module_idx,
        progress_bin,
        score_bin,
        phase,
        engagement,
    })
}

fn record_skip(reason: SkipReason) {
    tracing::debug!(%reason, "state builder skipped input");
    metrics::counter!(pw_observability::metrics::STATES_SKIPPED).increment(1);
}

/// Whether the window contains any action that isn't the synthetic
/// `module_progress_updated` bookkeeping token — the distinction behind
/// "0.0 → 0.25 only if any activity exists".
fn has_real_activity(summary: &UserLogSummary) -> bool {
    summary
        .recent_actions
        .iter()
        .any(|recent| recent.action.phase_class().is_some())
}

/// Weighted-vote phase classification over the recent-actions window.
/// Ties break `Pre < Active < Reflective`.
fn compute_phase(summary: &UserLogSummary) -> PhaseClass {
    let mut weights = [0.0_f64; 3];
    for recent in &summary.recent_actions {
        if let Some(class) = recent.action.phase_class() {
            weights[class as usize] += recent.action.engagement_weight();
        }
    }
    let classes = [PhaseClass::Pre, PhaseClass::Active, PhaseClass::Reflective];
    let max_weight = weights.iter().cloned().fold(f64::MIN, f64::max);
    classes
        .into_iter()
        .find(|class| (weights[*class as usize] - max_weight).abs() < f64::EPSILON)
        .unwrap_or(PhaseClass::Pre)
}

/// Weighted engagement score plus a time-consistency bonus, bucketed into
/// Low/Medium/High.
fn compute_engagement(
    summary: &UserLogSummary,
    thresholds: &pw_config::EngagementThresholds,
) -> Engagement {
    let weight_sum: f64 = summary
        .recent_actions
        .iter()
        .map(|recent| recent.action.engagement_weight())
        .sum();

    let window_days = ((summary.window_end - summary.window_start).max(86_400) as f64) / 86_400.0;
    let ratio = f64::from(summary.distinct_active_days) / window_days;
    let bonus = ratio * 4.0;

    Engagement::bucketize(weight_sum + bonus, thresholds.low_medium, thresholds.medium_high)
}

/// Folds one enriched event into `mastery`: if it reports a successful,
/// threshold-complete module, every LO the module touches (per CSR) has
/// its mastery raised by `config.lo_mastery_increment`, clamped to `[0,1]`
/// and never lowered.
pub fn update_mastery(
    mastery: &mut LoMastery,
    event: &LogEvent,
    csr: &dyn CourseStructureRegistry,
    config: &PipelineConfig,
) {
    let Some(module_id) = event.module_id else {
        return;
    };
    let completed = event.success == Some(true)
        && event
            .progress
            .map(|p| p >= config.module_completion_threshold)
            .unwrap_or(false);
    if !completed {
        return;
    }
    let Some(module) = csr.module(module_id) else {
        return;
    };
    for lo in &module.los {
        let observed = (mastery.mastery_of(lo) + config.lo_mastery_increment).clamp(0.0, 1.0);
        mastery.record_completion(lo.clone(), module_id, observed);
    }
}
