use clap::Parser;

mod commands;
mod output;
pub mod ux_error;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    pw_observability::init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::BuildStates(args) => commands::build_states::run(args).await,
        Commands::Train(args) => commands::train::run(args).await,
        Commands::Recommend(args) => commands::recommend::run(args).await,
        Commands::Explain(args) => commands::explain::run(args).await,
    };

    match result {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(err) => {
            ux_error::UxError::new(err.to_string()).display();
            std::process::ExitCode::from(1)
        }
    }
}
