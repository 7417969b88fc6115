//! `train --config CFG --out ARTIFACT`: builds one episode scenario per
//! (visible module × non-excluded cluster) pair and drives the trainer
//! until convergence or `max_episodes`, then publishes the artifact.

use crate::output;
use clap::Args as ClapArgs;
use pw_core::LearnerId;
use pw_cpr::{CprDocument, CprRegistry};
use pw_csr::{CsrDocument, CsrRegistry};
use pw_simulator::EpisodeConfig;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

#[derive(ClapArgs, Debug)]
pub struct Args {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub csr: PathBuf,

    #[arg(long)]
    pub cpr: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    /// Directory to receive periodic checkpoints; omit to skip checkpointing.
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long, default_value_t = 40)]
    pub max_steps: u32,

    #[arg(long, default_value_t = 3)]
    pub stuck_patience: u32,
}

pub async fn run(args: Args) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => pw_config::load_from_file(path)?,
        None => pw_config::PipelineConfig::default(),
    };

    let csr_raw = std::fs::read_to_string(&args.csr)?;
    let csr_document: CsrDocument = serde_json::from_str(&csr_raw)?;
    let cpr_raw = std::fs::read_to_string(&args.cpr)?;
    let cpr_document: CprDocument = serde_json::from_str(&cpr_raw)?;

    let scenarios: Vec<EpisodeConfig> = csr_document
        .modules
        .iter()
        .filter(|module| module.visible)
        .flat_map(|module| {
            cpr_document
                .clusters
                .iter()
                .filter(|cluster| !cluster.excluded)
                .map(move |cluster| EpisodeConfig {
                    learner_id: LearnerId::new(cluster.id.value()),
                    cluster_id: cluster.id,
                    course_id: module.course_id,
                    module_id: module.id,
                    max_steps: args.max_steps,
                    seed: 0,
                    stuck_patience: args.stuck_patience,
                })
        })
        .collect();

    if scenarios.is_empty() {
        crate::ux_error::UxError::new("no trainable (module, cluster) scenarios")
            .why("every module is hidden, or every cluster is excluded")
            .fix("check CSR module visibility and CPR cluster exclusion flags")
            .display();
        return Ok(1);
    }

    let csr = CsrRegistry::load_from_path(&args.csr)
        .map_err(|err| anyhow::anyhow!("loading CSR: {err}"))?;
    let cpr = CprRegistry::load_from_path(&args.cpr)
        .map_err(|err| anyhow::anyhow!("loading CPR: {err}"))?;
    let csr_snapshot = csr.snapshot();
    let cpr_snapshot = cpr.snapshot();

    let trainer = pw_trainer::Trainer::new(&*csr_snapshot, &*cpr_snapshot, &config);
    let cancel = AtomicBool::new(false);
    let run = trainer.train(&scenarios, args.seed, args.checkpoint_dir.as_deref(), &cancel);

    match run {
        Ok(run) => {
            let json = serde_json::to_string_pretty(&run.artifact)?;
            std::fs::write(&args.out, json)?;
            output::info(&format!(
                "committed artifact {} after {} episodes (converged: {})",
                run.artifact.version(),
                run.episodes_run,
                run.converged
            ));
            println!("{}", serde_json::to_string(&run.artifact.metadata)?);
            Ok(0)
        }
        Err(err) => {
            crate::ux_error::UxError::new("training did not commit an artifact")
                .why(err.to_string())
                .fix("the previously published artifact, if any, is untouched")
                .display();
            Ok(1)
        }
    }
}
