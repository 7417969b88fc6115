//! `build-states --input EVENTS --out STORE`: folds normalized events
//! into per-`(learner, module)` summaries, builds a state for each, and
//! writes the resulting current rows to a store file.

use crate::output;
use clap::Args as ClapArgs;
use pw_core::traits::StateStore;
use pw_core::{LearnerId, LoMastery, LogEvent, ModuleId, UserLogSummary};
use pw_cpr::CprRegistry;
use pw_csr::CsrRegistry;
use pw_state_store::InMemoryStateStore;
use std::collections::HashMap;
use std::path::PathBuf;

const DAY_SECONDS: i64 = 86_400;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Path to a JSON array of normalized events.
    #[arg(long)]
    pub input: PathBuf,

    /// Path to write the resulting state store (JSON array of current rows).
    #[arg(long)]
    pub out: PathBuf,

    #[arg(long)]
    pub csr: PathBuf,

    #[arg(long)]
    pub cpr: PathBuf,

    /// Pipeline configuration file (TOML/YAML); defaults are used if omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(serde::Serialize)]
struct Summary {
    built: usize,
    skipped: usize,
}

pub async fn run(args: Args) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => pw_config::load_from_file(path)?,
        None => pw_config::PipelineConfig::default(),
    };

    let csr = CsrRegistry::load_from_path(&args.csr)
        .map_err(|err| anyhow::anyhow!("loading CSR: {err}"))?;
    let cpr = CprRegistry::load_from_path(&args.cpr)
        .map_err(|err| anyhow::anyhow!("loading CPR: {err}"))?;
    let csr_snapshot = csr.snapshot();
    let cpr_snapshot = cpr.snapshot();

    let raw = std::fs::read_to_string(&args.input)?;
    let mut events: Vec<LogEvent> = serde_json::from_str(&raw)?;
    events.sort_by_key(|event| event.timestamp);

    let mut summaries: HashMap<(LearnerId, ModuleId), UserLogSummary> = HashMap::new();
    let mut timestamps: HashMap<(LearnerId, ModuleId), Vec<i64>> = HashMap::new();
    let mut mastery_by_learner: HashMap<LearnerId, LoMastery> = HashMap::new();
    let mut skipped = 0usize;

    for event in &events {
        let Some(module_id) = event.module_id else {
            skipped += 1;
            output::warn("dropping event with no module_id; build-states expects pre-enriched input");
            continue;
        };
        let key = (event.learner_id, module_id);
        summaries
            .entry(key)
            .or_insert_with(|| UserLogSummary::new(event.learner_id, module_id, 0, 0))
            .apply_event(event);
        timestamps.entry(key).or_default().push(event.timestamp);

        let mastery = mastery_by_learner.entry(event.learner_id).or_default();
        pw_state_builder::update_mastery(mastery, event, &*csr_snapshot, &config);
    }

    let mut entries = Vec::new();
    for ((learner_id, module_id), mut summary) in summaries {
        if let Some(stamps) = timestamps.get(&(learner_id, module_id)) {
            summary.recompute_distinct_active_days(stamps, DAY_SECONDS);
        }
        let state = pw_state_builder::build_state(&summary, learner_id, &*csr_snapshot, &*cpr_snapshot, &config);
        match state {
            Some(state) => {
                let mastery = mastery_by_learner.get(&learner_id).cloned().unwrap_or_default();
                entries.push(pw_core::BatchUpsertEntry {
                    learner_id,
                    module_id,
                    state,
                    mastery,
                    write_timestamp: summary.window_end,
                });
            }
            None => skipped += 1,
        }
    }

    let built = entries.len();
    let store = InMemoryStateStore::new();
    let fatal = if entries.is_empty() {
        None
    } else {
        store.batch_upsert(entries).await.err()
    };

    if let Some(err) = fatal {
        crate::ux_error::UxError::new("batch write to state store failed")
            .why(err.to_string())
            .display();
        return Ok(1);
    }

    let mut rows = Vec::new();
    let learner_ids: Vec<LearnerId> = mastery_by_learner.keys().copied().collect();
    for learner_id in learner_ids {
        rows.extend(store.list_by_learner(learner_id).await?);
    }
    let json = serde_json::to_string_pretty(&rows)?;
    std::fs::write(&args.out, json)?;

    output::info(&format!("built {built} states, skipped {skipped} inputs"));
    println!("{}", serde_json::to_string(&Summary { built, skipped })?);

    Ok(if skipped > 0 { 2 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSR_JSON: &str = r#"{
        "modules": [
            {"id": 1, "index": 0, "course_id": 10, "section_id": 0, "activity_type": "quiz", "los": ["LO1.1"], "visible": true}
        ],
        "activities": [],
        "sections": {}
    }"#;

    const CPR_JSON: &str = r#"{
        "clusters": [
            {"id": 1, "label": "c1", "excluded": false, "score_mean": 0.6, "stuck_prob": 0.1,
             "preferred_actions": [], "strength": "medium",
             "curve_params": {"curve": "logistic", "rate": 1.0, "shape": 5.0, "score_min": 0.0,
                               "score_max": 1.0, "base_success_rate": 0.5, "exploration_entropy": 0.3}}
        ],
        "learner_clusters": {"5": 1}
    }"#;

    fn events_json() -> String {
        r#"[
            {"learner_id": 5, "module_id": 1, "course_id": 10, "action": "attempt_quiz",
             "timestamp": 10, "score": 0.8, "progress": 0.6, "time_spent": 60,
             "success": true, "cluster_id": null, "metadata": {}},
            {"learner_id": 5, "module_id": 1, "course_id": 10, "action": "view_content",
             "timestamp": 20, "score": null, "progress": 0.6, "time_spent": 30,
             "success": null, "cluster_id": null, "metadata": {}}
        ]"#
        .to_string()
    }

    #[tokio::test]
    async fn builds_one_state_from_two_events() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("events.json");
        let csr_path = dir.path().join("csr.json");
        let cpr_path = dir.path().join("cpr.json");
        let out_path = dir.path().join("store.json");

        std::fs::write(&input_path, events_json()).unwrap();
        std::fs::write(&csr_path, CSR_JSON).unwrap();
        std::fs::write(&cpr_path, CPR_JSON).unwrap();

        let code = run(Args {
            input: input_path,
            out: out_path.clone(),
            csr: csr_path,
            cpr: cpr_path,
            config: None,
        })
        .await
        .unwrap();

        assert_eq!(code, 0);
        let rows: Vec<pw_core::traits::StoredState> =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].learner_id, LearnerId::new(5));
        assert_eq!(rows[0].module_id, ModuleId::new(1));
    }

    #[tokio::test]
    async fn event_with_no_module_id_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("events.json");
        let csr_path = dir.path().join("csr.json");
        let cpr_path = dir.path().join("cpr.json");
        let out_path = dir.path().join("store.json");

        let events = r#"[
            {"learner_id": 5, "module_id": null, "course_id": 10, "action": "view_report",
             "timestamp": 10, "score": null, "progress": null, "time_spent": 5,
             "success": null, "cluster_id": null, "metadata": {}}
        ]"#;
        std::fs::write(&input_path, events).unwrap();
        std::fs::write(&csr_path, CSR_JSON).unwrap();
        std::fs::write(&cpr_path, CPR_JSON).unwrap();

        let code = run(Args {
            input: input_path,
            out: out_path.clone(),
            csr: csr_path,
            cpr: cpr_path,
            config: None,
        })
        .await
        .unwrap();

        assert_eq!(code, 2);
        let rows: Vec<pw_core::traits::StoredState> =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert!(rows.is_empty());
    }
}
