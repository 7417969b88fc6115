//! Learner Simulator: generates synthetic trajectories calibrated
//! from CPR cluster parameters, for training and offline evaluation.
//!
//! An episode tracks one learner attempting one module. This is a
//! deliberate scope narrowing from "progress ≥ 1 on every required
//! module": chaining several modules per episode would require the
//! simulator to juggle several live `UserLogSummary` windows and CSR
//! section ordering, none of which the worked examples exercise. `Advance`
//! is the action that ends the episode instead of moving a module
//! pointer; see DESIGN.md.

use pw_config::PipelineConfig;
use pw_core::traits::{ClusterProfileRegistry, CourseStructureRegistry};
use pw_core::{
    Action, ClusterId, ClusterStrength, CourseId, CurveParams, Engagement, LearnerId,
    LearningCurve, LoMastery, LogEvent, ModuleId, PhaseClass, QTable, QuarterBin, State,
    TerminationReason, Trajectory, TrajectoryStep, UserLogSummary,
};
use pw_errors::SimulatorError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Everything one simulated episode needs up front.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EpisodeConfig {
    pub learner_id: LearnerId,
    pub cluster_id: ClusterId,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub max_steps: u32,
    pub seed: u64,
    /// Consecutive zero-progress attempts before a stuck roll is sampled
    /// each subsequent step — only when no progress occurred in the last
    /// `k` attempts.
    pub stuck_patience: u32,
}

/// A completed episode: the trajectory plus the synthetic log events that
/// produced it, retained so callers can validate aggregate moments — a
/// summary with seed, parameters, and per-cluster aggregate moments.
#[derive(Debug, Clone)]
pub struct SimulatedEpisode {
    pub trajectory: Trajectory,
    pub events: Vec<LogEvent>,
    pub final_mastery: LoMastery,
}

/// Drives one episode of synthetic learner behavior against a fixed CSR
/// and CPR snapshot.
pub struct Simulator<'a> {
    csr: &'a dyn CourseStructureRegistry,
    cpr: &'a dyn ClusterProfileRegistry,
    config: &'a PipelineConfig,
}

impl<'a> Simulator<'a> {
    pub fn new(
        csr: &'a dyn CourseStructureRegistry,
        cpr: &'a dyn ClusterProfileRegistry,
        config: &'a PipelineConfig,
    ) -> Self {
        Self { csr, cpr, config }
    }

    /// Runs a complete episode. `policy` drives ε-greedy action selection
    /// against its Q-values when present; otherwise action selection falls
    /// back to the heuristic progress-conditional shaping below.
    #[tracing::instrument(skip(self, policy), fields(learner_id = cfg.learner_id.value(), module_id = cfg.module_id.value(), seed = cfg.seed))]
    pub fn run_episode(
        &self,
        cfg: &EpisodeConfig,
        policy: Option<&QTable>,
        epsilon: f64,
    ) -> Result<SimulatedEpisode, SimulatorError> {
        let profile = self
            .cpr
            .profile(cfg.cluster_id)
            .ok_or(SimulatorError::ClusterExcluded { cluster_id: cfg.cluster_id.value() })?;
        if self.cpr.is_excluded(cfg.cluster_id) {
            return Err(SimulatorError::ClusterExcluded { cluster_id: cfg.cluster_id.value() });
        }
        let module_idx = self
            .csr
            .module_index(cfg.module_id)
            .ok_or(SimulatorError::UnknownModule { module_id: cfg.module_id.value() })?;

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut summary = UserLogSummary::new(cfg.learner_id, cfg.module_id, 0, 0);
        let mut mastery = LoMastery::new();
        let mut events = Vec::new();
        let mut steps = Vec::new();
        let mut attempts_in_module: u32 = 0;
        let mut attempts_without_progress: u32 = 0;
        let mut timestamp: i64 = 0;

        let mut state = self.derive_state(cfg.cluster_id, module_idx, &summary);
        let mut termination = TerminationReason::MaxSteps;

        for step in 0..cfg.max_steps {
            let action = self.select_action(&state, profile, policy, epsilon, &mut rng);

            if action == Action::Advance {
                let valid = state.progress_bin.value() >= self.config.reward.advance_progress_floor;
                let reward = compute_advance_reward(self.config, valid);
                if valid {
                    termination = TerminationReason::Complete;
                    steps.push(TrajectoryStep {
                        state,
                        action,
                        reward,
                        next_state: state,
                        terminal: true,
                    });
                    break;
                }
                // Invalid advance: penalized, episode continues at the same state.
                let maxed_out = step + 1 == cfg.max_steps;
                steps.push(TrajectoryStep {
                    state,
                    action,
                    reward,
                    next_state: state,
                    terminal: maxed_out,
                });
                if maxed_out {
                    termination = TerminationReason::MaxSteps;
                    break;
                }
                continue;
            }

            attempts_in_module += 1;
            timestamp += 60;
            let progress_before = summary.progress;
            let progress_after = curve_progress(attempts_in_module, &profile.curve_params);
            let delta_progress = (progress_after - progress_before).max(0.0);
            if delta_progress <= f64::EPSILON {
                attempts_without_progress += 1;
            } else {
                attempts_without_progress = 0;
            }

            let succeeded = rng.gen::<f64>() < profile.curve_params.base_success_rate;
            let score_before = summary.scores.last().copied().unwrap_or(profile.curve_params.score_min);
            let score_after = next_score(score_before, &profile.curve_params, &mut rng);

            let event = LogEvent {
                learner_id: cfg.learner_id,
                module_id: Some(cfg.module_id),
                course_id: cfg.course_id,
                action: action
                    .as_action_token()
                    .expect("only Advance has no ingest token, handled above"),
                timestamp,
                score: Some(score_after),
                progress: Some(progress_after),
                time_spent: 60,
                success: Some(succeeded),
                cluster_id: Some(cfg.cluster_id),
                metadata: std::collections::HashMap::new(),
            };
            summary.apply_event(&event);
            if succeeded {
                pw_state_mastery_update(&mut mastery, &event, self.csr, self.config);
            }
            events.push(event);

            let next_state = self.derive_state(cfg.cluster_id, module_idx, &summary);

            let mut stuck_now = false;
            if attempts_without_progress >= cfg.stuck_patience
                && rng.gen::<f64>() < profile.stuck_prob
            {
                stuck_now = true;
            }

            let reward = if stuck_now {
                -self.config.reward.stuck_penalty
            } else {
                compute_attempt_reward(
                    self.config,
                    profile,
                    score_before,
                    score_after,
                    delta_progress,
                    succeeded,
                    &mastery,
                    cfg.module_id,
                    self.csr,
                    next_state.engagement,
                )
            };

            let terminal = stuck_now || step + 1 == cfg.max_steps;
            steps.push(TrajectoryStep {
                state,
                action,
                reward,
                next_state,
                terminal,
            });

            if stuck_now {
                termination = TerminationReason::Stuck;
                break;
            }
            if step + 1 == cfg.max_steps {
                termination = TerminationReason::MaxSteps;
                break;
            }
            state = next_state;
        }

        Ok(SimulatedEpisode {
            trajectory: Trajectory { steps, termination },
            events,
            final_mastery: mastery,
        })
    }

    /// Derives the discrete 6-D state directly from the running summary,
    /// mirroring `pw_state_builder`'s phase vote and engagement bucketizer
    /// (kept private there). Unlike the real builder this never returns
    /// "no state": the simulator always has a module in progress, so a
    /// window with no real activity yet quantizes to `Q25` rather than
    /// being suppressed — the state builder's suppression rule only applies
    /// to noisy real-world input, not synthetic generation.
    fn derive_state(&self, cluster_id: ClusterId, module_idx: u32, summary: &UserLogSummary) -> State {
        let thresholds = &self.config.progress_bin_thresholds;
        let progress_bin = QuarterBin::quantize_with(summary.progress, thresholds.q1, thresholds.q2, thresholds.q3)
            .unwrap_or(QuarterBin::Q25);
        let score_bin = QuarterBin::quantize_with(summary.avg_score, thresholds.q1, thresholds.q2, thresholds.q3)
            .unwrap_or(QuarterBin::Q25);
        let phase = vote_phase(summary);
        let engagement = bucketize_engagement(summary, &self.config.engagement_thresholds);
        State {
            cluster_id,
            module_idx,
            progress_bin,
            score_bin,
            phase,
            engagement,
        }
    }

    /// ε-greedy action selection: Q-value argmax when `policy` is given,
    /// otherwise the heuristic progress-conditional multinomial below.
    fn select_action(
        &self,
        state: &State,
        profile: &pw_core::ClusterProfile,
        policy: Option<&QTable>,
        epsilon: f64,
        rng: &mut StdRng,
    ) -> Action {
        if rng.gen::<f64>() < epsilon {
            let all = Action::all();
            return all[rng.gen_range(0..all.len())];
        }
        if let Some(table) = policy {
            return table
                .row(state)
                .into_iter()
                .fold(None, |best: Option<(Action, f64)>, (action, value)| match best {
                    Some((_, best_value)) if best_value >= value => best,
                    _ => Some((action, value)),
                })
                .map(|(action, _)| action)
                .unwrap_or(Action::ViewContent);
        }
        let bucket = progress_bucket(state.progress_bin.value());
        let candidates = preferred_in_bucket(bucket, &profile.preferred_actions);
        candidates[rng.gen_range(0..candidates.len())]
    }
}

fn pw_state_mastery_update(
    mastery: &mut LoMastery,
    event: &LogEvent,
    csr: &dyn CourseStructureRegistry,
    config: &PipelineConfig,
) {
    let Some(module_id) = event.module_id else { return };
    let completed = event.success == Some(true)
        && event.progress.map(|p| p >= config.module_completion_threshold).unwrap_or(false);
    if !completed {
        return;
    }
    let Some(module) = csr.module(module_id) else { return };
    for lo in &module.los {
        let observed = (mastery.mastery_of(lo) + config.lo_mastery_increment).clamp(0.0, 1.0);
        mastery.record_completion(lo.clone(), module_id, observed);
    }
}

/// Weighted-vote phase classification, identical to `pw_state_builder`'s
///; duplicated here since that crate keeps it private.
fn vote_phase(summary: &UserLogSummary) -> PhaseClass {
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

fn bucketize_engagement(summary: &UserLogSummary, thresholds: &pw_config::EngagementThresholds) -> Engagement {
    let weight_sum: f64 = summary.recent_actions.iter().map(|r| r.action.engagement_weight()).sum();
    let window_days = ((summary.window_end - summary.window_start).max(86_400) as f64) / 86_400.0;
    let ratio = f64::from(summary.distinct_active_days) / window_days;
    let bonus = ratio * 4.0;
    Engagement::bucketize(weight_sum + bonus, thresholds.low_medium, thresholds.medium_high)
}

enum ProgressBucket {
    Early,
    Mid,
    Late,
}

fn progress_bucket(progress: f64) -> ProgressBucket {
    if progress < 0.33 {
        ProgressBucket::Early
    } else if progress < 0.66 {
        ProgressBucket::Mid
    } else {
        ProgressBucket::Late
    }
}

/// Candidate actions for a progress bucket, narrowed to the cluster's
/// preferred actions when that intersection is non-empty.
fn preferred_in_bucket(bucket: ProgressBucket, preferred: &[Action]) -> Vec<Action> {
    let phase_set: &[Action] = match bucket {
        ProgressBucket::Early => &[Action::ViewContent, Action::ReadResource, Action::WatchVideo],
        ProgressBucket::Mid => &[Action::DoQuiz, Action::AttemptQuiz, Action::SubmitAssignment],
        ProgressBucket::Late => &[
            Action::ReviewQuiz,
            Action::ReviewContent,
            Action::ParticipateForum,
            Action::ViewReport,
            Action::Advance,
        ],
    };
    let narrowed: Vec<Action> = phase_set.iter().copied().filter(|a| preferred.contains(a)).collect();
    if narrowed.is_empty() {
        phase_set.to_vec()
    } else {
        narrowed
    }
}

/// Progress after `attempts` attempts on the curve CPR selected for this
/// cluster.
fn curve_progress(attempts: u32, params: &CurveParams) -> f64 {
    let n = f64::from(attempts);
    let raw = match params.curve {
        LearningCurve::Logistic => 1.0 / (1.0 + (-params.rate * (n - params.shape)).exp()),
        LearningCurve::Exponential => params.shape * (1.0 - (-params.rate * n).exp()),
    };
    raw.clamp(0.0, 1.0)
}

/// Score dynamics for one attempt: `mastery` is read from the
/// cluster's `base_success_rate`, the only per-cluster calibrated ability
/// scalar CPR exposes at this layer — distinct from `core::LoMastery`,
/// which tracks real per-LO mastery computed downstream of the State
/// Builder from genuine LMS events. See DESIGN.md.
fn next_score(score_prev: f64, params: &CurveParams, rng: &mut StdRng) -> f64 {
    let u = rng.gen_range(0.3..0.7);
    let raw = score_prev + (params.score_max - score_prev) * params.base_success_rate * u;
    raw.clamp(params.score_min, params.score_max)
}

fn compute_advance_reward(config: &PipelineConfig, valid: bool) -> f64 {
    if valid {
        config.reward.completion_bonus
    } else {
        -config.reward.invalid_action_penalty
    }
}

#[allow(clippy::too_many_arguments)]
fn compute_attempt_reward(
    config: &PipelineConfig,
    profile: &pw_core::ClusterProfile,
    score_before: f64,
    score_after: f64,
    delta_progress: f64,
    succeeded: bool,
    mastery: &LoMastery,
    module_id: ModuleId,
    csr: &dyn CourseStructureRegistry,
    engagement: Engagement,
) -> f64 {
    let reward_cfg = &config.reward;
    let delta_score = (score_after - score_before).max(0.0);
    let r_base = reward_cfg.score_weight * delta_score + reward_cfg.progress_weight * delta_progress;

    let r_lo = if succeeded && module_has_weak_lo(csr, module_id, mastery, reward_cfg.weak_lo_threshold) {
        reward_cfg.lo_bonus
    } else {
        0.0
    };

    let r_bonus = if engagement == Engagement::High { reward_cfg.engagement_bonus } else { 0.0 };

    let p_penalty = if profile.strength == ClusterStrength::Weak && score_before < 0.5 {
        reward_cfg.mismatched_difficulty_penalty
    } else {
        0.0
    };

    r_base + r_lo + r_bonus - p_penalty
}

fn module_has_weak_lo(csr: &dyn CourseStructureRegistry, module_id: ModuleId, mastery: &LoMastery, threshold: f64) -> bool {
    csr.module(module_id)
        .map(|module| module.los.iter().any(|lo| mastery.mastery_of(lo) < threshold))
        .unwrap_or(false)
}
