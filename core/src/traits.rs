//! Seams between components: explicit, passed-in context objects rather
//! than process-wide singletons.

use crate::types::{
    ClusterId, ClusterProfile, CourseId, CsrActivity, CsrModule, LearnerId, LoMastery, ModuleId,
    State,
};
use async_trait::async_trait;
use pw_errors::StoreError;
use std::time::Duration;

/// Read-only, atomically-reloadable Course Structure Registry.
pub trait CourseStructureRegistry: Send + Sync {
    fn module(&self, module_id: ModuleId) -> Option<&CsrModule>;

    /// All visible modules in a course, in course order — the set the
    /// enricher fans a course-level event out over.
    fn visible_modules(&self, course_id: CourseId) -> Vec<&CsrModule>;

    fn module_index(&self, module_id: ModuleId) -> Option<u32>;

    /// Activities CSR associates with `action` inside `module_id`, the
    /// candidate set the recommender resolves from.
    fn activities_for(&self, module_id: ModuleId, action: crate::types::Action) -> Vec<&CsrActivity>;

    /// A stable content hash of the loaded registry, recorded in the
    /// policy artifact's `csr_hash`.
    fn content_hash(&self) -> String;
}

/// Read-only, atomically-reloadable Cluster Profile Registry.
pub trait ClusterProfileRegistry: Send + Sync {
    fn profile(&self, cluster_id: ClusterId) -> Option<&ClusterProfile>;

    /// The cluster a learner belongs to, resolved by whatever upstream
    /// mapping feeds this registry. Returns `None` when the learner is
    /// unknown to CPR; callers must then treat the learner as excluded.
    fn cluster_of(&self, learner_id: LearnerId) -> Option<ClusterId>;

    fn is_excluded(&self, cluster_id: ClusterId) -> bool;

    /// A stable content hash of the loaded registry, recorded in the
    /// policy artifact's `cpr_hash`.
    fn content_hash(&self) -> String;
}

/// The LMS collaborator the enricher queries for per-module progress when
/// expanding a course-level event. The LMS service itself is out of scope;
/// this is the narrow interface the core consumes.
#[async_trait]
pub trait LmsClient: Send + Sync {
    async fn module_progress(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
    ) -> Result<ModuleProgress, LmsClientError>;

    /// Bounded timeout every call must respect.
    fn call_timeout(&self) -> Duration;
}

/// What the LMS reports for one learner/module pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleProgress {
    pub progress: f64,
    pub raw_score: f64,
    pub raw_score_max: f64,
    pub time_spent: i64,
}

/// Transport-level failure from an [`LmsClient`] call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LmsClientError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Persists current and historical states. Implementors must
/// serialize writers to the same `(learner_id, module_id)` pair while
/// letting writers to different pairs proceed in parallel.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn upsert_current(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        state: State,
        mastery: LoMastery,
        write_timestamp: i64,
    ) -> Result<(), StoreError>;

    async fn get_current(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
    ) -> Result<Option<StoredState>, StoreError>;

    async fn list_by_learner(&self, learner_id: LearnerId) -> Result<Vec<StoredState>, StoreError>;

    /// History rows for the pair with `write_timestamp` in `[window.0,
    /// window.1]`, sorted by write timestamp ascending.
    async fn history(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        window: (i64, i64),
    ) -> Result<Vec<StoredState>, StoreError>;

    /// All-or-none: if any entry fails, no entry in the batch is applied
    ///.
    async fn batch_upsert(&self, entries: Vec<BatchUpsertEntry>) -> Result<usize, StoreError>;
}

/// A state row as persisted, with its write timestamp.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredState {
    pub learner_id: LearnerId,
    pub module_id: ModuleId,
    pub state: State,
    pub mastery: LoMastery,
    pub write_timestamp: i64,
}

/// One entry in a [`StateStore::batch_upsert`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUpsertEntry {
    pub learner_id: LearnerId,
    pub module_id: ModuleId,
    pub state: State,
    pub mastery: LoMastery,
    pub write_timestamp: i64,
}
