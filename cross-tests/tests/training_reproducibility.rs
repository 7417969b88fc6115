//! Idempotence: the same scenarios, seed, and registries must publish
//! the same artifact version across independent runs — and that artifact
//! must itself round-trip through JSON, since every CLI command and the
//! trainer's own version hash depend on `PolicyArtifact` serializing a
//! populated `QTable` correctly.

use pw_core::{ClusterId, CourseId, CsrModule, LearnerId, ModuleId, PolicyArtifact};
use pw_cpr::{CprDocument, CprSnapshot};
use pw_csr::{CsrDocument, CsrSnapshot};
use pw_simulator::EpisodeConfig;
use pw_testing::sample_cluster_profile;
use pw_trainer::Trainer;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

fn scenarios() -> (CsrSnapshot, CprSnapshot, Vec<EpisodeConfig>) {
    let csr = CsrSnapshot::build(CsrDocument {
        modules: vec![
            CsrModule {
                id: ModuleId::new(1),
                index: 0,
                course_id: CourseId::new(5),
                section_id: 0,
                activity_type: "quiz".to_string(),
                los: vec![],
                visible: true,
            },
            CsrModule {
                id: ModuleId::new(2),
                index: 1,
                course_id: CourseId::new(5),
                section_id: 0,
                activity_type: "quiz".to_string(),
                los: vec![],
                visible: true,
            },
        ],
        activities: vec![],
        sections: HashMap::new(),
    });
    let cpr = CprSnapshot::build(CprDocument {
        clusters: vec![sample_cluster_profile(1, false, pw_core::ClusterStrength::Medium, 0.1)],
        learner_clusters: HashMap::new(),
    });
    let scenarios = vec![
        EpisodeConfig {
            learner_id: LearnerId::new(1),
            cluster_id: ClusterId::new(1),
            course_id: CourseId::new(5),
            module_id: ModuleId::new(1),
            max_steps: 10,
            seed: 0,
            stuck_patience: 3,
        },
        EpisodeConfig {
            learner_id: LearnerId::new(1),
            cluster_id: ClusterId::new(1),
            course_id: CourseId::new(5),
            module_id: ModuleId::new(2),
            max_steps: 10,
            seed: 0,
            stuck_patience: 3,
        },
    ];
    (csr, cpr, scenarios)
}

#[test]
fn same_seed_and_registries_publish_the_same_version_twice() {
    let (csr, cpr, scenarios) = scenarios();
    let mut config = pw_config::PipelineConfig::default();
    config.max_episodes = 30;

    let trainer = Trainer::new(&csr, &cpr, &config);
    let cancel = AtomicBool::new(false);

    let first = trainer.train(&scenarios, 42, None, &cancel).unwrap();
    let second = trainer.train(&scenarios, 42, None, &cancel).unwrap();

    assert_eq!(first.artifact.version(), second.artifact.version());
    assert_eq!(first.episodes_run, second.episodes_run);
}

#[test]
fn a_trained_artifact_round_trips_through_json() {
    let (csr, cpr, scenarios) = scenarios();
    let mut config = pw_config::PipelineConfig::default();
    config.max_episodes = 30;

    let trainer = Trainer::new(&csr, &cpr, &config);
    let cancel = AtomicBool::new(false);
    let run = trainer.train(&scenarios, 7, None, &cancel).unwrap();

    assert!(!run.artifact.table.seen_states().collect::<Vec<_>>().is_empty());

    let json = serde_json::to_string(&run.artifact).unwrap();
    let decoded: PolicyArtifact = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, run.artifact);
}
