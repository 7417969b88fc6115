//! Tabular Q-Learning Trainer: drives [`pw_simulator::Simulator`]
//! episodes, applies the Bellman update to a growing [`QTable`], checkpoints
//! periodically, and publishes an immutable [`PolicyArtifact`] once trained.

use pw_config::PipelineConfig;
use pw_core::traits::{ClusterProfileRegistry, CourseStructureRegistry};
use pw_core::{EpsilonSchedule, PolicyArtifact, PolicyMetadata, QTable};
use pw_errors::TrainerError;
use pw_observability::metrics::{TRAINER_EPISODE_LENGTH, TRAINER_EPISODE_REWARD};
use pw_simulator::{EpisodeConfig, Simulator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// The outcome of a training run: the published artifact plus how it got
/// there.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub artifact: PolicyArtifact,
    pub episodes_run: u32,
    /// Whether the run stopped because the moving-average reward stopped
    /// moving, as opposed to exhausting `max_episodes`.
    pub converged: bool,
}

/// Drives training against a fixed CSR/CPR snapshot and configuration.
pub struct Trainer<'a> {
    csr: &'a dyn CourseStructureRegistry,
    cpr: &'a dyn ClusterProfileRegistry,
    config: &'a PipelineConfig,
}

/// The fields a published artifact's `version` is hashed from — everything
/// in [`PolicyMetadata`] except `version` itself, so the hash is a pure
/// function of training inputs and outcome: same seed, same config, same
/// registries produce the same artifact hash.
#[derive(serde::Serialize)]
struct VersionInput<'a> {
    table: &'a QTable,
    episodes: u32,
    alpha: f64,
    gamma: f64,
    epsilon_schedule: EpsilonSchedule,
    seed: u64,
    simulator_params_hash: &'a str,
    csr_hash: &'a str,
    cpr_hash: &'a str,
}

#[derive(serde::Serialize)]
struct SimulatorParamsInput<'a> {
    scenarios: &'a [EpisodeConfig],
    reward: &'a pw_config::RewardConfig,
    curve_params: &'a std::collections::HashMap<String, pw_config::ClusterCurveOverride>,
    learning_curve: pw_config::LearningCurveChoice,
}

impl<'a> Trainer<'a> {
    pub fn new(
        csr: &'a dyn CourseStructureRegistry,
        cpr: &'a dyn ClusterProfileRegistry,
        config: &'a PipelineConfig,
    ) -> Self {
        Self { csr, cpr, config }
    }

    /// Trains until convergence or `config.max_episodes`, whichever comes
    /// first. `scenarios` round-robin across episodes; each episode's RNG
    /// seed is drawn from a single `StdRng` seeded with `seed`, so the whole
    /// run is reproducible from `(scenarios, seed, config)` alone.
    /// `checkpoint_dir`, if given, receives an immutable checkpoint file
    /// every `config.checkpoint_every` episodes. `cancel` is polled between
    /// episodes;
    /// publication never happens on a cancelled run, so the
    /// currently-published artifact is untouched.
    #[tracing::instrument(skip(self, scenarios, cancel), fields(seed, scenario_count = scenarios.len()))]
    pub fn train(
        &self,
        scenarios: &[EpisodeConfig],
        seed: u64,
        checkpoint_dir: Option<&Path>,
        cancel: &AtomicBool,
    ) -> Result<TrainingRun, TrainerError> {
        if scenarios.is_empty() {
            return Err(TrainerError::Numerical { reason: "no training scenarios supplied".to_string() });
        }

        let simulator = Simulator::new(self.csr, self.cpr, self.config);
        let schedule = EpsilonSchedule {
            start: self.config.epsilon_start,
            end: self.config.epsilon_end,
            decay: self.config.epsilon_decay,
        };

        let mut table = QTable::new();
        let mut driver_rng = StdRng::seed_from_u64(seed);
        let window = self.config.convergence_window.max(1) as usize;
        let mut reward_history: VecDeque<f64> = VecDeque::with_capacity(2 * window);
        let mut episode: u32 = 0;
        let mut converged = false;

        while episode < self.config.max_episodes {
            if cancel.load(Ordering::Relaxed) {
                return Err(TrainerError::Cancelled { episodes: episode as usize });
            }

            let scenario = &scenarios[episode as usize % scenarios.len()];
            let mut episode_cfg = scenario.clone();
            episode_cfg.seed = driver_rng.gen();
            let epsilon = schedule.epsilon_at(episode);

            let outcome = simulator
                .run_episode(&episode_cfg, Some(&table), epsilon)
                .map_err(|err| TrainerError::Numerical { reason: err.to_string() })?;

            let mut cumulative = 0.0;
            for step in &outcome.trajectory.steps {
                if !step.reward.is_finite() {
                    return Err(TrainerError::Numerical {
                        reason: format!("non-finite reward at episode {episode}"),
                    });
                }
                table.update(
                    step.state,
                    step.action,
                    step.reward,
                    &step.next_state,
                    self.config.alpha,
                    self.config.gamma,
                );
                cumulative += step.reward;
            }

            metrics::histogram!(TRAINER_EPISODE_REWARD).record(cumulative);
            metrics::histogram!(TRAINER_EPISODE_LENGTH).record(outcome.trajectory.steps.len() as f64);

            reward_history.push_back(cumulative);
            if reward_history.len() > 2 * window {
                reward_history.pop_front();
            }

            episode += 1;

            if self.config.checkpoint_every > 0 && episode % self.config.checkpoint_every == 0 {
                if let Some(dir) = checkpoint_dir {
                    write_checkpoint(dir, episode, &table)?;
                }
            }

            if reward_history.len() == 2 * window {
                let first_avg: f64 = reward_history.iter().take(window).sum::<f64>() / window as f64;
                let second_avg: f64 = reward_history.iter().skip(window).sum::<f64>() / window as f64;
                if (second_avg - first_avg).abs() < self.config.convergence_delta {
                    converged = true;
                    break;
                }
            }
        }

        let simulator_params_hash = pw_utils::compute_value_hash(&SimulatorParamsInput {
            scenarios,
            reward: &self.config.reward,
            curve_params: &self.config.curve_params,
            learning_curve: self.config.learning_curve,
        })
        .map_err(|err| TrainerError::Numerical { reason: err.to_string() })?;
        let csr_hash = self.csr.content_hash();
        let cpr_hash = self.cpr.content_hash();

        let version = pw_utils::compute_value_hash(&VersionInput {
            table: &table,
            episodes: episode,
            alpha: self.config.alpha,
            gamma: self.config.gamma,
            epsilon_schedule: schedule,
            seed,
            simulator_params_hash: &simulator_params_hash,
            csr_hash: &csr_hash,
            cpr_hash: &cpr_hash,
        })
        .map_err(|err| TrainerError::Numerical { reason: err.to_string() })?;

        let metadata = PolicyMetadata {
            version,
            episodes: episode,
            alpha: self.config.alpha,
            gamma: self.config.gamma,
            epsilon_schedule: schedule,
            seed,
            simulator_params_hash,
            csr_hash,
            cpr_hash,
        };

        if let Some(dir) = checkpoint_dir {
            write_checkpoint(dir, episode, &table)?;
        }

        Ok(TrainingRun {
            artifact: PolicyArtifact::commit(table, metadata),
            episodes_run: episode,
            converged,
        })
    }
}

/// Writes `table` to `dir/checkpoint_{episode}.json` via a same-directory
/// temp file plus `persist`, so a reader never observes a partially-written
/// checkpoint. `tempfile` is reused here from its test-fixture use
/// elsewhere in this codebase — no production write path did this before.
/// See DESIGN.md.
fn write_checkpoint(dir: &Path, episode: u32, table: &QTable) -> Result<(), TrainerError> {
    std::fs::create_dir_all(dir).map_err(|err| TrainerError::CheckpointFailed { reason: err.to_string() })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|err| TrainerError::CheckpointFailed { reason: err.to_string() })?;
    serde_json::to_writer(&mut tmp, table).map_err(|err| TrainerError::CheckpointFailed { reason: err.to_string() })?;
    let final_path = dir.join(format!("checkpoint_{episode}.json"));
    tmp.persist(final_path)
        .map_err(|err| TrainerError::CheckpointFailed { reason: err.to_string() })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::{
        ClusterId, ClusterProfile, ClusterStrength, CourseId, CsrModule, CurveParams, LearnerId,
        LearningCurve, LoId, ModuleId,
    };
    use pw_cpr::{CprDocument, CprSnapshot};
    use pw_csr::{CsrDocument, CsrSnapshot};
    use std::collections::HashMap;

    fn csr() -> CsrSnapshot {
        CsrSnapshot::build(CsrDocument {
            modules: vec![CsrModule {
                id: ModuleId::new(1),
                index: 0,
                course_id: CourseId::new(5),
                section_id: 0,
                activity_type: "quiz".to_string(),
                los: vec![LoId::new("LO1.1")],
                visible: true,
            }],
            activities: vec![],
            sections: HashMap::new(),
        })
    }

    fn cpr() -> CprSnapshot {
        let profile = ClusterProfile {
            id: ClusterId::new(0),
            label: "cluster-0".to_string(),
            excluded: false,
            score_mean: 0.5,
            stuck_prob: 0.0,
            preferred_actions: vec![],
            strength: ClusterStrength::Medium,
            curve_params: CurveParams {
                curve: LearningCurve::Logistic,
                rate: 1.0,
                shape: 2.0,
                score_min: 0.1,
                score_max: 0.9,
                base_success_rate: 0.7,
                exploration_entropy: 0.3,
            },
        };
        let mut learner_clusters = HashMap::new();
        learner_clusters.insert(LearnerId::new(1), profile.id);
        CprSnapshot::build(CprDocument { clusters: vec![profile], learner_clusters })
    }

    fn scenario() -> EpisodeConfig {
        EpisodeConfig {
            learner_id: LearnerId::new(1),
            cluster_id: ClusterId::new(0),
            course_id: CourseId::new(5),
            module_id: ModuleId::new(1),
            max_steps: 15,
            seed: 0,
            stuck_patience: 3,
        }
    }

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.max_episodes = 20;
        config.checkpoint_every = 0;
        config.convergence_window = 1_000_000; // effectively disabled for these tests
        config
    }

    #[test]
    fn same_seed_and_config_produce_identical_artifacts() {
        let csr = csr();
        let cpr = cpr();
        let config = small_config();
        let scenarios = vec![scenario()];

        let trainer = Trainer::new(&csr, &cpr, &config);
        let cancel = AtomicBool::new(false);
        let first = trainer.train(&scenarios, 7, None, &cancel).unwrap();
        let second = trainer.train(&scenarios, 7, None, &cancel).unwrap();

        assert_eq!(first.artifact.version(), second.artifact.version());
        assert_eq!(first.artifact.table, second.artifact.table);
        assert_eq!(first.episodes_run, config.max_episodes);
    }

    #[test]
    fn cancellation_before_first_episode_aborts_without_publishing() {
        let csr = csr();
        let cpr = cpr();
        let config = small_config();
        let scenarios = vec![scenario()];

        let trainer = Trainer::new(&csr, &cpr, &config);
        let cancel = AtomicBool::new(true);
        let result = trainer.train(&scenarios, 7, None, &cancel);
        assert!(matches!(result, Err(TrainerError::Cancelled { episodes: 0 })));
    }

    #[test]
    fn checkpoint_every_episode_writes_a_file_per_episode() {
        let csr = csr();
        let cpr = cpr();
        let mut config = small_config();
        config.max_episodes = 3;
        config.checkpoint_every = 1;
        let scenarios = vec![scenario()];
        let dir = tempfile::tempdir().unwrap();

        let trainer = Trainer::new(&csr, &cpr, &config);
        let cancel = AtomicBool::new(false);
        let run = trainer.train(&scenarios, 11, Some(dir.path()), &cancel).unwrap();

        assert!(dir.path().join(format!("checkpoint_{}.json", run.episodes_run)).exists());
    }

    #[test]
    fn empty_scenarios_rejected() {
        let csr = csr();
        let cpr = cpr();
        let config = small_config();
        let trainer = Trainer::new(&csr, &cpr, &config);
        let cancel = AtomicBool::new(false);
        let result = trainer.train(&[], 1, None, &cancel);
        assert!(matches!(result, Err(TrainerError::Numerical { .. })));
    }
}
