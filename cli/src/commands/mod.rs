pub mod build_states;
pub mod explain;
pub mod recommend;
pub mod train;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pw",
    author,
    version,
    about = "Adaptive pathway RL pipeline: build states, train a policy, recommend, explain"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "build-states", about = "Turn normalized events into stored states")]
    BuildStates(build_states::Args),

    #[command(about = "Train a Q-learning policy and publish it as an artifact")]
    Train(train::Args),

    #[command(about = "Rank actions and resolve an activity for a learner/module")]
    Recommend(recommend::Args),

    #[command(about = "Explain a policy's action choice via Shapley attribution")]
    Explain(explain::Args),
}
