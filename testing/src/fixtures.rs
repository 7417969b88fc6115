//! Builders for CSR/CPR documents and a reusable [`LmsClient`] test
//! double, mirroring the shapes `pw-enricher`'s and `pw-state-builder`'s
//! own `#[cfg(test)]` modules already build by hand.

use async_trait::async_trait;
use pw_core::traits::{CourseStructureRegistry, LmsClient, LmsClientError};
use pw_core::{
    Action, ClusterId, ClusterProfile, ClusterStrength, CourseId, CsrActivity, CsrModule,
    CurveParams, LearnerId, LearningCurve, LoId, ModuleId, ModuleProgress,
};
use pw_cpr::CprDocument;
use pw_csr::CsrDocument;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// `module_count` visible modules in one course, indexed `0..module_count`,
/// each with a single learning outcome `LO{module_index}.1`.
#[must_use]
pub fn sample_csr_document(course_id: i64, module_count: u32) -> CsrDocument {
    let modules = (0..module_count)
        .map(|index| CsrModule {
            id: ModuleId::new(i64::from(index) + 1),
            index,
            course_id: CourseId::new(course_id),
            section_id: 0,
            activity_type: "quiz".to_string(),
            los: vec![LoId::new(format!("LO{index}.1"))],
            visible: true,
        })
        .collect();
    CsrDocument { modules, activities: Vec::new(), sections: HashMap::new() }
}

/// One activity resolving `action` inside `module_id`, touching `los`.
#[must_use]
pub fn sample_activity(activity_id: &str, module_id: ModuleId, action: Action, los: &[&str], course_order: u32) -> CsrActivity {
    CsrActivity {
        activity_id: activity_id.to_string(),
        module_id,
        action,
        los: los.iter().map(|lo| LoId::new(*lo)).collect(),
        course_order,
    }
}

/// A calibrated cluster profile with the default logistic curve used
/// throughout the simulator's own fixtures.
#[must_use]
pub fn sample_cluster_profile(id: i64, excluded: bool, strength: ClusterStrength, stuck_prob: f64) -> ClusterProfile {
    ClusterProfile {
        id: ClusterId::new(id),
        label: format!("cluster-{id}"),
        excluded,
        score_mean: 0.6,
        stuck_prob,
        preferred_actions: Vec::new(),
        strength,
        curve_params: CurveParams {
            curve: LearningCurve::Logistic,
            rate: 1.0,
            shape: 5.0,
            score_min: 0.0,
            score_max: 1.0,
            base_success_rate: 0.5,
            exploration_entropy: 0.3,
        },
    }
}

/// A CPR document with `profiles`, each learner in `learner_clusters`
/// assigned to the cluster id paired with it.
#[must_use]
pub fn sample_cpr_document(profiles: Vec<ClusterProfile>, learner_clusters: &[(i64, i64)]) -> CprDocument {
    CprDocument {
        clusters: profiles,
        learner_clusters: learner_clusters
            .iter()
            .map(|(learner, cluster)| (LearnerId::new(*learner), ClusterId::new(*cluster)))
            .collect(),
    }
}

/// A reusable [`LmsClient`] test double: returns the configured
/// [`ModuleProgress`] for a module id, or [`LmsClientError::Upstream`] for
/// any module not explicitly seeded. Generalizes the private `MockLms`
/// each consuming crate would otherwise hand-roll for its own tests.
pub struct MockLmsClient {
    results: HashMap<i64, ModuleProgress>,
    timeout: Duration,
    calls: AtomicU32,
}

impl MockLmsClient {
    #[must_use]
    pub fn new() -> Self {
        Self { results: HashMap::new(), timeout: Duration::from_millis(100), calls: AtomicU32::new(0) }
    }

    #[must_use]
    pub fn with_progress(mut self, module_id: ModuleId, progress: ModuleProgress) -> Self {
        self.results.insert(module_id.value(), progress);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of `module_progress` calls observed so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLmsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LmsClient for MockLmsClient {
    async fn module_progress(&self, _learner_id: LearnerId, module_id: ModuleId) -> Result<ModuleProgress, LmsClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .get(&module_id.value())
            .copied()
            .ok_or_else(|| LmsClientError::Upstream(format!("no seeded progress for module {module_id}")))
    }

    fn call_timeout(&self) -> Duration {
        self.timeout
    }
}

/// A minimal [`CourseStructureRegistry`] over a fixed module list, for
/// tests that need a registry without going through `pw-csr`'s file
/// loading or hashing.
pub struct FixedCsr {
    modules: Vec<CsrModule>,
}

impl FixedCsr {
    #[must_use]
    pub fn new(modules: Vec<CsrModule>) -> Self {
        Self { modules }
    }
}

impl CourseStructureRegistry for FixedCsr {
    fn module(&self, module_id: ModuleId) -> Option<&CsrModule> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    fn visible_modules(&self, course_id: CourseId) -> Vec<&CsrModule> {
        self.modules.iter().filter(|m| m.course_id == course_id && m.visible).collect()
    }

    fn module_index(&self, module_id: ModuleId) -> Option<u32> {
        self.module(module_id).map(|m| m.index)
    }

    fn activities_for(&self, _module_id: ModuleId, _action: Action) -> Vec<&CsrActivity> {
        Vec::new()
    }

    fn content_hash(&self) -> String {
        "fixed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_lms_client_reports_seeded_progress() {
        let client = MockLmsClient::new().with_progress(
            ModuleId::new(1),
            ModuleProgress { progress: 0.5, raw_score: 75.0, raw_score_max: 100.0, time_spent: 60 },
        );
        let progress = client.module_progress(LearnerId::new(1), ModuleId::new(1)).await.unwrap();
        assert_eq!(progress.progress, 0.5);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_lms_client_errors_on_unseeded_module() {
        let client = MockLmsClient::new();
        let result = client.module_progress(LearnerId::new(1), ModuleId::new(99)).await;
        assert!(result.is_err());
    }

    #[test]
    fn sample_csr_document_builds_requested_module_count() {
        let document = sample_csr_document(5, 6);
        assert_eq!(document.modules.len(), 6);
        assert!(document.modules.iter().all(|m| m.visible));
    }
}
