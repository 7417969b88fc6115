//! The tabular action-value function.

use super::state::State;
use super::vocabulary::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `state → action → value`. Unseen entries default to `0.0` without
/// being materialized, so the table only grows with states actually
/// visited during training.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<State, HashMap<Action, f64>>,
}

// `State` is a struct, not one of the primitives JSON object keys must
// serialize to, so the derived `HashMap` (de)serialization can't be used
// directly on the wire; round-trip through an entry list instead.
impl Serialize for QTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<(&State, &HashMap<Action, f64>)> = self.values.iter().collect();
        entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(State, HashMap<Action, f64>)>::deserialize(deserializer)?;
        Ok(Self { values: entries.into_iter().collect() })
    }
}

impl QTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, state: &State, action: Action) -> f64 {
        self.values
            .get(state)
            .and_then(|row| row.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, state: State, action: Action, value: f64) {
        self.values.entry(state).or_default().insert(action, value);
    }

    /// `maxₐ' Q(s',a')` over the full action set, as the Bellman update
    /// requires. Actions never explicitly written still count at
    /// their implicit `0.0`.
    #[must_use]
    pub fn max_value(&self, state: &State) -> f64 {
        Action::all()
            .into_iter()
            .map(|action| self.get(state, action))
            .fold(f64::MIN, f64::max)
    }

    /// Applies one Bellman update at `(state, action)` and returns the new
    /// value:
    /// `Q(s,a) ← Q(s,a) + α · [r + γ·maxₐ' Q(s',a') − Q(s,a)]`
    pub fn update(
        &mut self,
        state: State,
        action: Action,
        reward: f64,
        next_state: &State,
        alpha: f64,
        gamma: f64,
    ) -> f64 {
        let current = self.get(&state, action);
        let target = reward + gamma * self.max_value(next_state);
        let updated = current + alpha * (target - current);
        self.set(state, action, updated);
        updated
    }

    /// Whether `state` has any recorded entries at all — distinguishes a
    /// genuinely-unseen state (which triggers the recommender's Hamming
    /// fallback) from one whose actions are merely all at `0.0`.
    #[must_use]
    pub fn has_seen(&self, state: &State) -> bool {
        self.values.contains_key(state)
    }

    #[must_use]
    pub fn seen_states(&self) -> impl Iterator<Item = &State> {
        self.values.keys()
    }

    /// All `(action, value)` pairs for a state, actions never written
    /// included at their implicit `0.0`, in the stable `Action::all()` order.
    #[must_use]
    pub fn row(&self, state: &State) -> Vec<(Action, f64)> {
        Action::all()
            .into_iter()
            .map(|action| (action, self.get(state, action)))
            .collect()
    }
}
