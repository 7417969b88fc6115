//! A state derived from real activity resolves, through
//! the recommender, to the activity maximizing the threshold-mastery gap
//! among the top action's candidates.

use pw_core::{
    Action, ActionToken, ClusterId, CourseId, CsrActivity, CsrModule, Engagement, LearnerId,
    LoId, LoMastery, LogEvent, ModuleId, PhaseClass, QTable, QuarterBin,
};
use pw_cpr::{CprDocument, CprSnapshot};
use pw_csr::{CsrDocument, CsrSnapshot};
use pw_recommender::Recommender;
use pw_state_builder::build_state;
use std::collections::HashMap;

#[test]
fn builder_derived_state_resolves_to_the_higher_gap_activity() {
    let learner_id = LearnerId::new(5);
    let module_id = ModuleId::new(1);
    let lo_1_1 = LoId::new("LO1.1");
    let lo_1_2 = LoId::new("LO1.2");

    let csr = CsrSnapshot::build(CsrDocument {
        modules: vec![CsrModule {
            id: module_id,
            index: 0,
            course_id: CourseId::new(5),
            section_id: 0,
            activity_type: "quiz".to_string(),
            los: vec![lo_1_1.clone(), lo_1_2.clone()],
            visible: true,
        }],
        activities: vec![
            CsrActivity { activity_id: "q46".to_string(), module_id, action: Action::AttemptQuiz, los: vec![lo_1_2.clone()], course_order: 0 },
            CsrActivity { activity_id: "q47".to_string(), module_id, action: Action::AttemptQuiz, los: vec![lo_1_1.clone()], course_order: 1 },
        ],
        sections: HashMap::new(),
    });

    let cpr = CprSnapshot::build(CprDocument {
        clusters: vec![pw_core::ClusterProfile {
            id: ClusterId::new(0),
            label: "c0".to_string(),
            excluded: false,
            score_mean: 0.6,
            stuck_prob: 0.1,
            preferred_actions: vec![],
            strength: pw_core::ClusterStrength::Medium,
            curve_params: pw_core::CurveParams {
                curve: pw_core::LearningCurve::Logistic,
                rate: 1.0,
                shape: 5.0,
                score_min: 0.0,
                score_max: 1.0,
                base_success_rate: 0.5,
                exploration_entropy: 0.3,
            },
        }],
        learner_clusters: HashMap::from([(learner_id, ClusterId::new(0))]),
    });

    let config = pw_config::PipelineConfig::default();

    // Two attempt_quiz attempts, both at progress 0.5 / score 0.25 — votes
    // Active, stays under the Low/Medium engagement threshold.
    let mut summary = pw_core::UserLogSummary::new(learner_id, module_id, 0, 0);
    for ts in [10_i64, 20] {
        summary.apply_event(&LogEvent {
            learner_id,
            module_id: Some(module_id),
            course_id: CourseId::new(5),
            action: ActionToken::AttemptQuiz,
            timestamp: ts,
            score: Some(0.25),
            progress: Some(0.5),
            time_spent: 30,
            success: Some(false),
            cluster_id: None,
            metadata: HashMap::new(),
        });
    }

    let state = build_state(&summary, learner_id, &csr, &cpr, &config).expect("activity warrants a state");
    assert_eq!(state.cluster_id, ClusterId::new(0));
    assert_eq!(state.module_idx, 0);
    assert_eq!(state.progress_bin, QuarterBin::Q50);
    assert_eq!(state.score_bin, QuarterBin::Q25);
    assert_eq!(state.phase, PhaseClass::Active);
    assert_eq!(state.engagement, Engagement::Low);

    let mut mastery = LoMastery::new();
    mastery.record_completion(lo_1_2.clone(), module_id, 0.2);
    mastery.record_completion(lo_1_1.clone(), module_id, 0.4);

    let mut table = QTable::new();
    table.set(state, Action::AttemptQuiz, 10.0);
    let artifact = pw_core::PolicyArtifact::commit(
        table,
        pw_core::PolicyMetadata {
            version: "v-scenario-6".to_string(),
            episodes: 1,
            alpha: 0.1,
            gamma: 0.95,
            epsilon_schedule: pw_core::EpsilonSchedule { start: 1.0, end: 0.05, decay: 0.01 },
            seed: 0,
            simulator_params_hash: "h".to_string(),
            csr_hash: "h".to_string(),
            cpr_hash: "h".to_string(),
        },
    );

    let recommender = Recommender::new(&csr, &config);
    let recommendation = recommender.recommend(&state, Some(&artifact), &mastery, module_id, 3).unwrap();

    assert_eq!(recommendation.ranked_actions[0].action, Action::AttemptQuiz);
    assert_eq!(recommendation.chosen_activity_id.as_deref(), Some("q46"));
}
