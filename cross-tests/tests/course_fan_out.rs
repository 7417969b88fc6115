//! A course-level event fans out through the enricher into
//! one per-module event, each of which the state builder either turns
//! into a state or suppresses, and the surviving states land in the
//! store.

use pw_core::traits::{BatchUpsertEntry, StateStore};
use pw_core::{ClusterId, LearnerId, ModuleId, ModuleProgress, QuarterBin, UserLogSummary};
use pw_cpr::{CprDocument, CprSnapshot};
use pw_csr::CsrSnapshot;
use pw_enricher::{Enricher, RawEvent};
use pw_state_builder::build_state;
use pw_state_store::InMemoryStateStore;
use pw_testing::{sample_cluster_profile, sample_csr_document, MockLmsClient};
use std::collections::HashMap;

#[tokio::test]
async fn course_level_event_expands_into_the_expected_progress_bins() {
    let course_id = 5;
    let learner_id = LearnerId::new(5);

    let csr_document = sample_csr_document(course_id, 6);
    let csr_for_enrich = CsrSnapshot::build(csr_document.clone());
    let csr_for_build = CsrSnapshot::build(csr_document);

    let progresses = [0.6, 0.4, 0.2, 0.0, 0.5, 0.8];
    let mut lms = MockLmsClient::new();
    for (i, progress) in progresses.iter().enumerate() {
        let module_id = ModuleId::new(i as i64 + 1);
        lms = lms.with_progress(
            module_id,
            ModuleProgress { progress: *progress, raw_score: 75.0, raw_score_max: 100.0, time_spent: 60 },
        );
    }

    let enricher = Enricher::new(lms, csr_for_enrich);
    let raw = RawEvent {
        learner_id,
        module_id: None,
        course_id: pw_core::CourseId::new(course_id),
        action: "course_viewed".to_string(),
        timestamp: 1000,
        score: None,
        score_max: None,
        progress: None,
        time_spent: 0,
        success: None,
        cluster_id: None,
    };
    let outcome = enricher.enrich(raw).await.unwrap();
    assert_eq!(outcome.events.len(), 6);
    assert!(outcome.warnings.is_empty());

    let cpr = CprSnapshot::build(CprDocument {
        clusters: vec![sample_cluster_profile(0, false, pw_core::ClusterStrength::Medium, 0.1)],
        learner_clusters: HashMap::from([(learner_id, ClusterId::new(0))]),
    });
    let config = pw_config::PipelineConfig::default();

    let expected_progress_bins = [
        Some(QuarterBin::Q75),
        Some(QuarterBin::Q50),
        Some(QuarterBin::Q25),
        None, // progress 0.0, synthetic-only window -> suppressed
        Some(QuarterBin::Q50),
        Some(QuarterBin::Q100),
    ];

    let store = InMemoryStateStore::new();
    let mut write_timestamp = 0i64;
    for (event, expected_bin) in outcome.events.iter().zip(expected_progress_bins.iter()) {
        let module_id = event.module_id.unwrap();
        let mut summary = UserLogSummary::new(learner_id, module_id, 0, 0);
        summary.apply_event(event);

        let state = build_state(&summary, learner_id, &csr_for_build, &cpr, &config);
        assert_eq!(state.map(|s| s.progress_bin), *expected_bin, "module {module_id}");

        if let Some(state) = state {
            write_timestamp += 1;
            let written = store
                .batch_upsert(vec![BatchUpsertEntry {
                    learner_id,
                    module_id,
                    state,
                    mastery: pw_core::LoMastery::new(),
                    write_timestamp,
                }])
                .await
                .unwrap();
            assert_eq!(written, 1);
        }
    }

    let rows = store.list_by_learner(learner_id).await.unwrap();
    assert_eq!(rows.len(), 5, "the all-zero-progress module produces no row");
}
