//! Course Structure Registry: a read-only,
//! atomically-reloadable mapping from module id to section/activity-type/LO
//! metadata, plus the concrete activities the recommender resolves
//! actions to.

use arc_swap::ArcSwap;
use pw_core::traits::CourseStructureRegistry;
use pw_core::{Action, CourseId, CsrActivity, CsrModule, ModuleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The on-disk/wire shape of a CSR artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrDocument {
    pub modules: Vec<CsrModule>,
    #[serde(default)]
    pub activities: Vec<CsrActivity>,
    /// Section index → human label.
    #[serde(default)]
    pub sections: HashMap<u32, String>,
}

/// Errors loading or parsing a CSR document.
#[derive(Debug, thiserror::Error)]
pub enum CsrLoadError {
    #[error("IO error reading CSR artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSR artifact: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An immutable, indexed view over one loaded CSR document. Cheap to
/// clone behind an `Arc`; rebuilt wholesale on reload rather than mutated
/// in place — rebuilt wholesale on reload rather than mutated, an
/// explicit, atomically-swapped snapshot.
#[derive(Debug, Clone)]
pub struct CsrSnapshot {
    modules: HashMap<ModuleId, CsrModule>,
    by_course: HashMap<CourseId, Vec<ModuleId>>,
    activities_by_module_action: HashMap<(ModuleId, Action), Vec<CsrActivity>>,
    content_hash: String,
}

impl CsrSnapshot {
    #[must_use]
    pub fn build(document: CsrDocument) -> Self {
        let content_hash = pw_utils::compute_value_hash(&document)
            .unwrap_or_else(|_| "unhashable".to_string());

        let mut modules = HashMap::new();
        let mut by_course: HashMap<CourseId, Vec<ModuleId>> = HashMap::new();
        for module in document.modules {
            by_course.entry(module.course_id).or_default().push(module.id);
            modules.insert(module.id, module);
        }
        for ids in by_course.values_mut() {
            ids.sort_by_key(|id| modules.get(id).map(|m| m.index).unwrap_or(u32::MAX));
        }

        let mut activities_by_module_action: HashMap<(ModuleId, Action), Vec<CsrActivity>> =
            HashMap::new();
        for activity in document.activities {
            activities_by_module_action
                .entry((activity.module_id, activity.action))
                .or_default()
                .push(activity);
        }
        for activities in activities_by_module_action.values_mut() {
            activities.sort_by_key(|a| a.course_order);
        }

        Self {
            modules,
            by_course,
            activities_by_module_action,
            content_hash,
        }
    }
}

impl CourseStructureRegistry for CsrSnapshot {
    fn module(&self, module_id: ModuleId) -> Option<&CsrModule> {
        self.modules.get(&module_id)
    }

    fn visible_modules(&self, course_id: CourseId) -> Vec<&CsrModule> {
        self.by_course
            .get(&course_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.modules.get(id))
            .filter(|m| m.visible)
            .collect()
    }

    fn module_index(&self, module_id: ModuleId) -> Option<u32> {
        self.modules.get(&module_id).map(|m| m.index)
    }

    fn activities_for(&self, module_id: ModuleId, action: Action) -> Vec<&CsrActivity> {
        self.activities_by_module_action
            .get(&(module_id, action))
            .into_iter()
            .flatten()
            .collect()
    }

    fn content_hash(&self) -> String {
        self.content_hash.clone()
    }
}

/// The reloadable registry handle consumers hold. Reads never block a
/// concurrent reload; readers always see one complete, internally
/// consistent snapshot — no partial update, the same guarantee the state
/// store makes for its own writes, at a different layer.
pub struct CsrRegistry {
    current: ArcSwap<CsrSnapshot>,
}

impl CsrRegistry {
    #[must_use]
    pub fn new(snapshot: CsrSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CsrLoadError> {
        let snapshot = Self::snapshot_from_path(path)?;
        Ok(Self::new(snapshot))
    }

    fn snapshot_from_path(path: &Path) -> Result<CsrSnapshot, CsrLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let document: CsrDocument = serde_json::from_str(&raw)?;
        Ok(CsrSnapshot::build(document))
    }

    /// Atomically replaces the in-memory snapshot. Readers mid-flight keep
    /// using the snapshot they already loaded; there is no partial view.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub fn reload_from_path(&self, path: &Path) -> Result<(), CsrLoadError> {
        let snapshot = Self::snapshot_from_path(path)?;
        self.current.store(Arc::new(snapshot));
        tracing::info!("csr registry reloaded");
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<CsrSnapshot> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::LoId;

    fn sample_document() -> CsrDocument {
        CsrDocument {
            modules: vec![
                CsrModule {
                    id: ModuleId::new(1),
                    index: 0,
                    course_id: CourseId::new(5),
                    section_id: 0,
                    activity_type: "quiz".to_string(),
                    los: vec![LoId::new("LO1.1"), LoId::new("LO1.2")],
                    visible: true,
                },
                CsrModule {
                    id: ModuleId::new(2),
                    index: 1,
                    course_id: CourseId::new(5),
                    section_id: 0,
                    activity_type: "video".to_string(),
                    los: vec![],
                    visible: false,
                },
            ],
            activities: vec![
                CsrActivity {
                    activity_id: "q46".to_string(),
                    module_id: ModuleId::new(1),
                    action: Action::AttemptQuiz,
                    los: vec![LoId::new("LO1.2")],
                    course_order: 0,
                },
                CsrActivity {
                    activity_id: "q47".to_string(),
                    module_id: ModuleId::new(1),
                    action: Action::AttemptQuiz,
                    los: vec![LoId::new("LO1.1")],
                    course_order: 1,
                },
            ],
            sections: HashMap::new(),
        }
    }

    #[test]
    fn visible_modules_filters_and_orders_by_index() {
        let snapshot = CsrSnapshot::build(sample_document());
        let visible = snapshot.visible_modules(CourseId::new(5));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, ModuleId::new(1));
    }

    #[test]
    fn activities_for_returns_course_ordered_candidates() {
        let snapshot = CsrSnapshot::build(sample_document());
        let activities = snapshot.activities_for(ModuleId::new(1), Action::AttemptQuiz);
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].activity_id, "q46");
    }

    #[test]
    fn reload_swaps_the_whole_snapshot_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csr.json");
        std::fs::write(&path, serde_json::to_string(&sample_document()).unwrap()).unwrap();
        let registry = CsrRegistry::load_from_path(&path).unwrap();
        assert_eq!(registry.snapshot().visible_modules(CourseId::new(5)).len(), 1);

        let mut updated = sample_document();
        updated.modules[1].visible = true;
        std::fs::write(&path, serde_json::to_string(&updated).unwrap()).unwrap();
        registry.reload_from_path(&path).unwrap();
        assert_eq!(registry.snapshot().visible_modules(CourseId::new(5)).len(), 2);
    }
}
