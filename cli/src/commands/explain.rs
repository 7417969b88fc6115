//! `explain --state S --policy A`: computes a Shapley attribution for
//! one `(state, action)` decision against a committed policy artifact.

use clap::Args as ClapArgs;
use pw_core::traits::StoredState;
use pw_core::{Action, PolicyArtifact, State};
use std::path::PathBuf;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Path to a JSON-encoded [`pw_core::State`] to explain.
    #[arg(long)]
    pub state: PathBuf,

    /// Policy artifact produced by `train`.
    #[arg(long)]
    pub policy: PathBuf,

    #[arg(long, value_enum)]
    pub action: CliAction,

    /// Background states (JSON array), typically the state store's rows.
    #[arg(long)]
    pub background: PathBuf,

    #[arg(long)]
    pub expected_version: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliAction {
    ViewContent,
    ReadResource,
    WatchVideo,
    DoQuiz,
    AttemptQuiz,
    SubmitAssignment,
    ReviewQuiz,
    ReviewContent,
    ParticipateForum,
    ViewReport,
    Advance,
}

impl From<CliAction> for Action {
    fn from(value: CliAction) -> Self {
        match value {
            CliAction::ViewContent => Action::ViewContent,
            CliAction::ReadResource => Action::ReadResource,
            CliAction::WatchVideo => Action::WatchVideo,
            CliAction::DoQuiz => Action::DoQuiz,
            CliAction::AttemptQuiz => Action::AttemptQuiz,
            CliAction::SubmitAssignment => Action::SubmitAssignment,
            CliAction::ReviewQuiz => Action::ReviewQuiz,
            CliAction::ReviewContent => Action::ReviewContent,
            CliAction::ParticipateForum => Action::ParticipateForum,
            CliAction::ViewReport => Action::ViewReport,
            CliAction::Advance => Action::Advance,
        }
    }
}

pub async fn run(args: Args) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => pw_config::load_from_file(path)?,
        None => pw_config::PipelineConfig::default(),
    };

    let Ok(state_raw) = std::fs::read_to_string(&args.state) else {
        crate::ux_error::UxError::new(format!("cannot read state file '{}'", args.state.display())).display();
        return Ok(1);
    };
    let state: State = serde_json::from_str(&state_raw)?;

    let Ok(policy_raw) = std::fs::read_to_string(&args.policy) else {
        crate::ux_error::policy_missing(&args.policy.display().to_string()).display();
        return Ok(1);
    };
    let artifact: PolicyArtifact = serde_json::from_str(&policy_raw)?;

    let background_raw = std::fs::read_to_string(&args.background)?;
    let background: Vec<State> = match serde_json::from_str::<Vec<State>>(&background_raw) {
        Ok(states) => states,
        Err(_) => {
            let rows: Vec<StoredState> = serde_json::from_str(&background_raw)?;
            rows.into_iter().map(|row| row.state).collect()
        }
    };

    let explainer = pw_explainer::Explainer::new(&config);
    let action: Action = args.action.into();
    match explainer.explain(
        &state,
        action,
        Some(&artifact),
        &background,
        args.expected_version.as_deref(),
        args.seed,
    ) {
        Ok(explanation) => {
            println!("{}", serde_json::to_string(&explanation)?);
            Ok(0)
        }
        Err(err) => {
            crate::ux_error::UxError::new("could not compute attribution").why(err.to_string()).display();
            Ok(1)
        }
    }
}
