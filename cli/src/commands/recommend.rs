//! `recommend --learner L --module M`: looks up the learner's stored
//! state and mastery, then ranks actions against a trained policy.

use clap::Args as ClapArgs;
use pw_core::traits::StoredState;
use pw_core::{LearnerId, ModuleId, PolicyArtifact};
use pw_csr::CsrRegistry;
use std::path::PathBuf;

#[derive(ClapArgs, Debug)]
pub struct Args {
    #[arg(long)]
    pub learner: i64,

    #[arg(long)]
    pub module: i64,

    /// State store file produced by `build-states`.
    #[arg(long)]
    pub store: PathBuf,

    /// Policy artifact produced by `train`.
    #[arg(long)]
    pub policy: PathBuf,

    #[arg(long)]
    pub csr: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    pub top_k: usize,
}

pub async fn run(args: Args) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => pw_config::load_from_file(path)?,
        None => pw_config::PipelineConfig::default(),
    };

    let learner_id = LearnerId::new(args.learner);
    let module_id = ModuleId::new(args.module);

    let Ok(store_raw) = std::fs::read_to_string(&args.store) else {
        crate::ux_error::store_unreadable(&args.store.display().to_string(), "file not found").display();
        return Ok(1);
    };
    let rows: Vec<StoredState> = serde_json::from_str(&store_raw)?;
    let Some(row) = rows
        .into_iter()
        .find(|row| row.learner_id == learner_id && row.module_id == module_id)
    else {
        crate::ux_error::no_state_for_pair(args.learner, args.module).display();
        return Ok(1);
    };

    let Ok(policy_raw) = std::fs::read_to_string(&args.policy) else {
        crate::ux_error::policy_missing(&args.policy.display().to_string()).display();
        return Ok(1);
    };
    let artifact: PolicyArtifact = serde_json::from_str(&policy_raw)?;

    let csr = CsrRegistry::load_from_path(&args.csr)
        .map_err(|err| anyhow::anyhow!("loading CSR: {err}"))?;
    let csr_snapshot = csr.snapshot();

    let recommender = pw_recommender::Recommender::new(&*csr_snapshot, &config);
    match recommender.recommend(&row.state, Some(&artifact), &row.mastery, module_id, args.top_k) {
        Ok(recommendation) => {
            println!("{}", serde_json::to_string(&recommendation)?);
            Ok(0)
        }
        Err(err) => {
            crate::ux_error::UxError::new("could not produce a recommendation").why(err.to_string()).display();
            Ok(1)
        }
    }
}
