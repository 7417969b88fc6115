//! Cluster Profile Registry: a read-only,
//! atomically-reloadable catalog of behavioral clusters, plus the
//! learner→cluster assignment the State Builder consults.

use arc_swap::ArcSwap;
use pw_core::traits::ClusterProfileRegistry;
use pw_core::{ClusterId, ClusterProfile, LearnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The on-disk/wire shape of a CPR artifact, extended with the
/// learner→cluster assignment map a deployment supplies alongside the
/// per-cluster catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CprDocument {
    pub clusters: Vec<ClusterProfile>,
    #[serde(default)]
    pub learner_clusters: HashMap<LearnerId, ClusterId>,
}

#[derive(Debug, thiserror::Error)]
pub enum CprLoadError {
    #[error("IO error reading CPR artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CPR artifact: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An immutable, indexed view over one loaded CPR document.
#[derive(Debug, Clone)]
pub struct CprSnapshot {
    clusters: HashMap<ClusterId, ClusterProfile>,
    learner_clusters: HashMap<LearnerId, ClusterId>,
    content_hash: String,
}

impl CprSnapshot {
    #[must_use]
    pub fn build(document: CprDocument) -> Self {
        let content_hash = pw_utils::compute_value_hash(&document)
            .unwrap_or_else(|_| "unhashable".to_string());
        let clusters = document
            .clusters
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        Self {
            clusters,
            learner_clusters: document.learner_clusters,
            content_hash,
        }
    }
}

impl ClusterProfileRegistry for CprSnapshot {
    fn profile(&self, cluster_id: ClusterId) -> Option<&ClusterProfile> {
        self.clusters.get(&cluster_id)
    }

    /// An unmapped learner yields `None`, which callers must treat as
    /// excluded rather than silently defaulting to a "medium" cluster —
    /// see DESIGN.md for why the missing-cluster default resolves this way.
    fn cluster_of(&self, learner_id: LearnerId) -> Option<ClusterId> {
        self.learner_clusters.get(&learner_id).copied()
    }

    fn is_excluded(&self, cluster_id: ClusterId) -> bool {
        self.clusters
            .get(&cluster_id)
            .map(|c| c.excluded)
            .unwrap_or(true)
    }

    fn content_hash(&self) -> String {
        self.content_hash.clone()
    }
}

/// The reloadable registry handle consumers hold.
pub struct CprRegistry {
    current: ArcSwap<CprSnapshot>,
}

impl CprRegistry {
    #[must_use]
    pub fn new(snapshot: CprSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CprLoadError> {
        let snapshot = Self::snapshot_from_path(path)?;
        Ok(Self::new(snapshot))
    }

    fn snapshot_from_path(path: &Path) -> Result<CprSnapshot, CprLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let document: CprDocument = serde_json::from_str(&raw)?;
        Ok(CprSnapshot::build(document))
    }

    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub fn reload_from_path(&self, path: &Path) -> Result<(), CprLoadError> {
        let snapshot = Self::snapshot_from_path(path)?;
        self.current.store(Arc::new(snapshot));
        tracing::info!("cpr registry reloaded");
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<CprSnapshot> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::{ClusterStrength, CurveParams, LearningCurve};

    fn profile(id: i64, excluded: bool) -> ClusterProfile {
        ClusterProfile {
            id: ClusterId::new(id),
            label: format!("cluster-{id}"),
            excluded,
            score_mean: 0.6,
            stuck_prob: 0.1,
            preferred_actions: vec![],
            strength: ClusterStrength::Medium,
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

    fn sample_document() -> CprDocument {
        let mut learner_clusters = HashMap::new();
        learner_clusters.insert(LearnerId::new(5), ClusterId::new(0));
        CprDocument {
            clusters: vec![profile(0, false), profile(99, true)],
            learner_clusters,
        }
    }

    #[test]
    fn missing_learner_maps_to_none() {
        let snapshot = CprSnapshot::build(sample_document());
        assert_eq!(snapshot.cluster_of(LearnerId::new(5)), Some(ClusterId::new(0)));
        assert_eq!(snapshot.cluster_of(LearnerId::new(6)), None);
    }

    #[test]
    fn unknown_cluster_is_treated_as_excluded() {
        let snapshot = CprSnapshot::build(sample_document());
        assert!(!snapshot.is_excluded(ClusterId::new(0)));
        assert!(snapshot.is_excluded(ClusterId::new(99)));
        assert!(snapshot.is_excluded(ClusterId::new(12345)));
    }

    #[test]
    fn reload_swaps_the_whole_snapshot_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpr.json");
        std::fs::write(&path, serde_json::to_string(&sample_document()).unwrap()).unwrap();
        let registry = CprRegistry::load_from_path(&path).unwrap();
        assert!(!registry.snapshot().is_excluded(ClusterId::new(0)));

        let mut updated = sample_document();
        updated.clusters[0].excluded = true;
        std::fs::write(&path, serde_json::to_string(&updated).unwrap()).unwrap();
        registry.reload_from_path(&path).unwrap();
        assert!(registry.snapshot().is_excluded(ClusterId::new(0)));
    }
}
