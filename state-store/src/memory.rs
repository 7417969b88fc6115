//! In-memory [`pw_core::traits::StateStore`] backend: a `DashMap`-backed
//! current-row table plus an append-only history table, guarded by a
//! per-`(learner, module)` lock so writers to the same pair serialize
//! while writers to different pairs proceed in parallel.

use async_trait::async_trait;
use dashmap::DashMap;
use pw_core::traits::{BatchUpsertEntry, StateStore, StoredState};
use pw_core::{LearnerId, LoMastery, ModuleId, State};
use pw_errors::StoreError;
use std::sync::Arc;
use tokio::sync::Mutex;

type Key = (LearnerId, ModuleId);

#[derive(Default)]
pub struct InMemoryStateStore {
    current: DashMap<Key, StoredState>,
    history: DashMap<Key, Vec<StoredState>>,
    locks: DashMap<Key, Arc<Mutex<()>>>,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: Key) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn apply_one(&self, entry: &BatchUpsertEntry) -> Result<(), StoreError> {
        let key = (entry.learner_id, entry.module_id);
        if let Some(existing) = self.current.get(&key) {
            if existing.write_timestamp >= entry.write_timestamp {
                return Err(StoreError::Conflict {
                    learner_id: entry.learner_id.value(),
                    module_id: entry.module_id.value(),
                });
            }
        }
        let row = StoredState {
            learner_id: entry.learner_id,
            module_id: entry.module_id,
            state: entry.state,
            mastery: entry.mastery.clone(),
            write_timestamp: entry.write_timestamp,
        };
        self.current.insert(key, row.clone());
        self.history.entry(key).or_default().push(row);
        Ok(())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn upsert_current(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        state: State,
        mastery: LoMastery,
        write_timestamp: i64,
    ) -> Result<(), StoreError> {
        let key = (learner_id, module_id);
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        let entry = BatchUpsertEntry {
            learner_id,
            module_id,
            state,
            mastery,
            write_timestamp,
        };
        let result = self.apply_one(&entry);
        match &result {
            Ok(()) => metrics::counter!(pw_observability::metrics::STORE_WRITES).increment(1),
            Err(StoreError::Conflict { .. }) => {
                metrics::counter!(pw_observability::metrics::STORE_CONFLICTS).increment(1);
            }
            Err(_) => {}
        }
        result
    }

    async fn get_current(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
    ) -> Result<Option<StoredState>, StoreError> {
        Ok(self.current.get(&(learner_id, module_id)).map(|r| r.clone()))
    }

    async fn list_by_learner(&self, learner_id: LearnerId) -> Result<Vec<StoredState>, StoreError> {
        Ok(self
            .current
            .iter()
            .filter(|entry| entry.key().0 == learner_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn history(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        window: (i64, i64),
    ) -> Result<Vec<StoredState>, StoreError> {
        let mut rows: Vec<StoredState> = self
            .history
            .get(&(learner_id, module_id))
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.write_timestamp >= window.0 && row.write_timestamp <= window.1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|row| row.write_timestamp);
        Ok(rows)
    }

    /// All-or-none: the whole batch is applied under one lock per
    /// touched key, acquired up front; on the first conflict every key the
    /// batch touched is rolled back to its pre-batch snapshot.
    async fn batch_upsert(&self, entries: Vec<BatchUpsertEntry>) -> Result<usize, StoreError> {
        let keys: Vec<Key> = entries
            .iter()
            .map(|e| (e.learner_id, e.module_id))
            .collect();
        let locks: Vec<Arc<Mutex<()>>> = keys.iter().map(|k| self.lock_for(*k)).collect();
        let mut guards = Vec::with_capacity(locks.len());
        for lock in &locks {
            guards.push(lock.lock().await);
        }

        let snapshots: Vec<(Key, Option<StoredState>, Vec<StoredState>)> = keys
            .iter()
            .map(|key| {
                (
                    *key,
                    self.current.get(key).map(|r| r.clone()),
                    self.history.get(key).map(|r| r.clone()).unwrap_or_default(),
                )
            })
            .collect();

        for entry in &entries {
            if let Err(err) = self.apply_one(entry) {
                for (key, current_snapshot, history_snapshot) in &snapshots {
                    match current_snapshot {
                        Some(row) => {
                            self.current.insert(*key, row.clone());
                        }
                        None => {
                            self.current.remove(key);
                        }
                    }
                    self.history.insert(*key, history_snapshot.clone());
                }
                metrics::counter!(pw_observability::metrics::STORE_CONFLICTS).increment(1);
                return Err(err);
            }
        }
        metrics::counter!(pw_observability::metrics::STORE_WRITES).increment(entries.len() as u64);
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::{ClusterId, Engagement, PhaseClass, QuarterBin};

    fn state() -> State {
        State {
            cluster_id: ClusterId::new(0),
            module_idx: 0,
            progress_bin: QuarterBin::Q50,
            score_bin: QuarterBin::Q25,
            phase: PhaseClass::Active,
            engagement: Engagement::Low,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let store = InMemoryStateStore::new();
        store
            .upsert_current(LearnerId::new(1), ModuleId::new(2), state(), LoMastery::new(), 100)
            .await
            .unwrap();
        let row = store
            .get_current(LearnerId::new(1), ModuleId::new(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.write_timestamp, 100);
    }

    #[tokio::test]
    async fn stale_write_is_rejected_as_conflict() {
        let store = InMemoryStateStore::new();
        store
            .upsert_current(LearnerId::new(1), ModuleId::new(2), state(), LoMastery::new(), 100)
            .await
            .unwrap();
        let result = store
            .upsert_current(LearnerId::new(1), ModuleId::new(2), state(), LoMastery::new(), 50)
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn history_accumulates_and_filters_by_window() {
        let store = InMemoryStateStore::new();
        for ts in [10, 20, 30] {
            store
                .upsert_current(LearnerId::new(1), ModuleId::new(2), state(), LoMastery::new(), ts)
                .await
                .unwrap();
        }
        let rows = store
            .history(LearnerId::new(1), ModuleId::new(2), (15, 30))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].write_timestamp, 20);
        assert_eq!(rows[1].write_timestamp, 30);
    }

    #[tokio::test]
    async fn batch_upsert_rolls_back_all_on_single_conflict() {
        let store = InMemoryStateStore::new();
        store
            .upsert_current(LearnerId::new(9), ModuleId::new(9), state(), LoMastery::new(), 500)
            .await
            .unwrap();

        let entries = vec![
            BatchUpsertEntry {
                learner_id: LearnerId::new(1),
                module_id: ModuleId::new(1),
                state: state(),
                mastery: LoMastery::new(),
                write_timestamp: 10,
            },
            BatchUpsertEntry {
                learner_id: LearnerId::new(9),
                module_id: ModuleId::new(9),
                state: state(),
                mastery: LoMastery::new(),
                write_timestamp: 10, // stale: conflicts with the 500 above
            },
        ];
        let result = store.batch_upsert(entries).await;
        assert!(result.is_err());
        assert!(store
            .get_current(LearnerId::new(1), ModuleId::new(1))
            .await
            .unwrap()
            .is_none());
    }
}
