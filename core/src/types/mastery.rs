//! Per-learner Learning Outcome mastery.

use super::ids::{LoId, ModuleId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Mapping LO id → mastery in `[0,1]`, plus the reverse index used by the
/// recommender to find activities touching a given LO. Mastery is
/// monotonic non-decreasing under new successful completions; it resets
/// only via [`LoMastery::resync`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoMastery {
    mastery: HashMap<LoId, f64>,
    activities_by_lo: HashMap<LoId, HashSet<ModuleId>>,
}

impl LoMastery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mastery_of(&self, lo: &LoId) -> f64 {
        self.mastery.get(lo).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn modules_touching(&self, lo: &LoId) -> Option<&HashSet<ModuleId>> {
        self.activities_by_lo.get(lo)
    }

    #[must_use]
    pub fn all_los(&self) -> impl Iterator<Item = &LoId> {
        self.mastery.keys()
    }

    /// Records that `module_id` exercises `lo` and may raise its mastery.
    /// The new value only takes effect if it is not lower than the current
    /// one — mastery never regresses from a successful completion.
    pub fn record_completion(&mut self, lo: LoId, module_id: ModuleId, observed_mastery: f64) {
        self.activities_by_lo
            .entry(lo.clone())
            .or_default()
            .insert(module_id);
        let current = self.mastery.entry(lo).or_insert(0.0);
        if observed_mastery > *current {
            *current = observed_mastery.clamp(0.0, 1.0);
        }
    }

    /// Explicit reset to a freshly observed snapshot, discarding history.
    /// The only sanctioned way mastery may decrease.
    pub fn resync(&mut self, snapshot: HashMap<LoId, f64>) {
        self.mastery = snapshot;
    }

    /// LOs with `mastery < threshold`, the set the reward shaping and the
    /// recommender's activity resolution both consult.
    #[must_use]
    pub fn weak_los(&self, threshold: f64) -> Vec<LoId> {
        let mut weak: Vec<LoId> = self
            .mastery
            .iter()
            .filter(|(_, &m)| m < threshold)
            .map(|(lo, _)| lo.clone())
            .collect();
        weak.sort();
        weak
    }
}
