//! Postgres-backed [`pw_core::traits::StateStore`], schema modeled on the
//! `CREATE TABLE IF NOT EXISTS` + indexed-column style used elsewhere in
//! this codebase's storage layer.

use async_trait::async_trait;
use pw_core::traits::{BatchUpsertEntry, StateStore, StoredState};
use pw_core::{LearnerId, LoMastery, ModuleId, State};
use pw_errors::StoreError;
use sqlx::{Pool, Postgres, Row};

pub struct PostgresStateStore {
    pool: Pool<Postgres>,
}

impl PostgresStateStore {
    pub async fn new(connection_url: &str) -> Result<Self, StoreError> {
        let pool = Pool::connect(connection_url)
            .await
            .map_err(|e| StoreError::Backend { reason: e.to_string() })?;
        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    #[must_use]
    pub fn with_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pathway_current_state (
                learner_id BIGINT NOT NULL,
                module_id BIGINT NOT NULL,
                state JSONB NOT NULL,
                mastery JSONB NOT NULL,
                write_timestamp BIGINT NOT NULL,
                PRIMARY KEY (learner_id, module_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pathway_current_state_learner
             ON pathway_current_state(learner_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pathway_state_history (
                id BIGSERIAL PRIMARY KEY,
                learner_id BIGINT NOT NULL,
                module_id BIGINT NOT NULL,
                state JSONB NOT NULL,
                mastery JSONB NOT NULL,
                write_timestamp BIGINT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pathway_state_history_lookup
             ON pathway_state_history(learner_id, module_id, write_timestamp)",
        )
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn apply_one(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        entry: &BatchUpsertEntry,
    ) -> Result<(), StoreError> {
        let existing_ts: Option<i64> = sqlx::query(
            "SELECT write_timestamp FROM pathway_current_state WHERE learner_id = $1 AND module_id = $2",
        )
        .bind(entry.learner_id.value())
        .bind(entry.module_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_error)?
        .map(|row| row.get("write_timestamp"));

        if let Some(ts) = existing_ts {
            if ts >= entry.write_timestamp {
                return Err(StoreError::Conflict {
                    learner_id: entry.learner_id.value(),
                    module_id: entry.module_id.value(),
                });
            }
        }

        let state_json = serde_json::to_value(entry.state).map_err(serialization_error)?;
        let mastery_json = serde_json::to_value(&entry.mastery).map_err(serialization_error)?;

        sqlx::query(
            "INSERT INTO pathway_current_state (learner_id, module_id, state, mastery, write_timestamp)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (learner_id, module_id)
             DO UPDATE SET state = EXCLUDED.state, mastery = EXCLUDED.mastery,
                           write_timestamp = EXCLUDED.write_timestamp",
        )
        .bind(entry.learner_id.value())
        .bind(entry.module_id.value())
        .bind(&state_json)
        .bind(&mastery_json)
        .bind(entry.write_timestamp)
        .execute(&mut *tx)
        .await
        .map_err(backend_error)?;

        sqlx::query(
            "INSERT INTO pathway_state_history (learner_id, module_id, state, mastery, write_timestamp)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.learner_id.value())
        .bind(entry.module_id.value())
        .bind(&state_json)
        .bind(&mastery_json)
        .bind(entry.write_timestamp)
        .execute(&mut *tx)
        .await
        .map_err(backend_error)?;

        Ok(())
    }
}

fn backend_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend { reason: err.to_string() }
}

fn serialization_error(err: serde_json::Error) -> StoreError {
    StoreError::Serialization { reason: err.to_string() }
}

fn row_to_stored_state(row: sqlx::postgres::PgRow) -> Result<StoredState, StoreError> {
    let state_json: serde_json::Value = row.get("state");
    let mastery_json: serde_json::Value = row.get("mastery");
    Ok(StoredState {
        learner_id: LearnerId::new(row.get("learner_id")),
        module_id: ModuleId::new(row.get("module_id")),
        state: serde_json::from_value(state_json).map_err(serialization_error)?,
        mastery: serde_json::from_value(mastery_json).map_err(serialization_error)?,
        write_timestamp: row.get("write_timestamp"),
    })
}

#[async_trait]
impl StateStore for PostgresStateStore {
    async fn upsert_current(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        state: State,
        mastery: LoMastery,
        write_timestamp: i64,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend_error)?;
        let entry = BatchUpsertEntry {
            learner_id,
            module_id,
            state,
            mastery,
            write_timestamp,
        };
        let result = Self::apply_one(&mut tx, &entry).await;
        match &result {
            Ok(()) => {
                tx.commit().await.map_err(backend_error)?;
                metrics::counter!(pw_observability::metrics::STORE_WRITES).increment(1);
            }
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
        let row = sqlx::query(
            "SELECT learner_id, module_id, state, mastery, write_timestamp
             FROM pathway_current_state WHERE learner_id = $1 AND module_id = $2",
        )
        .bind(learner_id.value())
        .bind(module_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;
        row.map(row_to_stored_state).transpose()
    }

    async fn list_by_learner(&self, learner_id: LearnerId) -> Result<Vec<StoredState>, StoreError> {
        let rows = sqlx::query(
            "SELECT learner_id, module_id, state, mastery, write_timestamp
             FROM pathway_current_state WHERE learner_id = $1",
        )
        .bind(learner_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;
        rows.into_iter().map(row_to_stored_state).collect()
    }

    async fn history(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        window: (i64, i64),
    ) -> Result<Vec<StoredState>, StoreError> {
        let rows = sqlx::query(
            "SELECT learner_id, module_id, state, mastery, write_timestamp
             FROM pathway_state_history
             WHERE learner_id = $1 AND module_id = $2
               AND write_timestamp >= $3 AND write_timestamp <= $4
             ORDER BY write_timestamp ASC",
        )
        .bind(learner_id.value())
        .bind(module_id.value())
        .bind(window.0)
        .bind(window.1)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;
        rows.into_iter().map(row_to_stored_state).collect()
    }

    /// A single transaction covers the whole batch; any conflict rolls the
    /// transaction back, leaving no partial writes — all or none.
    async fn batch_upsert(&self, entries: Vec<BatchUpsertEntry>) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend_error)?;
        for entry in &entries {
            if let Err(err) = Self::apply_one(&mut tx, entry).await {
                tx.rollback().await.map_err(backend_error)?;
                metrics::counter!(pw_observability::metrics::STORE_CONFLICTS).increment(1);
                return Err(err);
            }
        }
        tx.commit().await.map_err(backend_error)?;
        metrics::counter!(pw_observability::metrics::STORE_WRITES).increment(entries.len() as u64);
        Ok(entries.len())
    }
}
