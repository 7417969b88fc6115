//! Trajectory steps produced by the simulator and consumed by the
//! trainer.

use super::state::State;
use super::vocabulary::Action;
use serde::{Deserialize, Serialize};

/// One `(state, action, reward, next_state, terminal)` transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    pub state: State,
    pub action: Action,
    pub reward: f64,
    pub next_state: State,
    pub terminal: bool,
}

/// A finite episode: an ordered list of steps plus the reason it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub steps: Vec<TrajectoryStep>,
    pub termination: TerminationReason,
}

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Complete,
    Stuck,
    MaxSteps,
}

impl Trajectory {
    /// Cumulative reward is the sum of per-transition rewards, with no
    /// hidden terms.
    #[must_use]
    pub fn cumulative_reward(&self) -> f64 {
        self.steps.iter().map(|step| step.reward).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Count of distinct states visited, tracked alongside reward and
    /// length per episode.
    #[must_use]
    pub fn distinct_states_visited(&self) -> usize {
        use std::collections::HashSet;
        let mut seen: HashSet<State> = HashSet::new();
        for step in &self.steps {
            seen.insert(step.state);
        }
        if let Some(last) = self.steps.last() {
            seen.insert(last.next_state);
        }
        seen.len()
    }
}
