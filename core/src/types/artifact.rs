//! The versioned, immutable [`PolicyArtifact`].

use super::qtable::QTable;
use serde::{Deserialize, Serialize};

/// Learning-curve family a cluster's simulator parameters select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningCurve {
    Logistic,
    Exponential,
}

/// The epsilon-greedy exploration schedule used during training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    pub start: f64,
    pub end: f64,
    pub decay: f64,
}

impl EpsilonSchedule {
    /// The `learning_curve`-adjacent knob is per-cluster; epsilon decay here
    /// is a single exponential schedule shared across the run.
    #[must_use]
    pub fn epsilon_at(&self, episode: u32) -> f64 {
        let value = self.end + (self.start - self.end) * (-self.decay * episode as f64).exp();
        value.clamp(self.end.min(self.start), self.start.max(self.end))
    }
}

/// Training metadata recorded alongside the Q-table so a run is
/// reproducible and its provenance auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub version: String,
    pub episodes: u32,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon_schedule: EpsilonSchedule,
    pub seed: u64,
    pub simulator_params_hash: String,
    pub csr_hash: String,
    pub cpr_hash: String,
}

/// A Q-Table plus its metadata. Immutable once published; addressable by
/// `version`. Construct only via [`PolicyArtifact::commit`] —
/// publication is meant to be the single atomic act that produces one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyArtifact {
    pub table: QTable,
    pub metadata: PolicyMetadata,
}

impl PolicyArtifact {
    #[must_use]
    pub fn commit(table: QTable, metadata: PolicyMetadata) -> Self {
        Self { table, metadata }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.metadata.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_schedule_decays_toward_end() {
        let schedule = EpsilonSchedule {
            start: 1.0,
            end: 0.05,
            decay: 0.01,
        };
        let early = schedule.epsilon_at(0);
        let late = schedule.epsilon_at(1000);
        assert!((early - 1.0).abs() < 1e-9);
        assert!(late < early);
        assert!(late >= schedule.end - 1e-9);
    }
}
