use std::process::ExitCode;

use intake::prelude::*;
use intake::providers::completions::OpenAI;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
}

async fn run(config: Config) -> Result<(), Error> {
    let model = OpenAI::new(&config.model)?;
    let client = Client::new(
        model,
        DEFAULT_PREAMBLE,
        config.model.temperature,
        config.model.max_tokens,
        ToolSet::application(),
    )
    .with_max_iterations(config.max_iterations);

    let mut session = Session::new(client);
    info!(session = %session.id(), model = %config.model.model, "Starting session");
    let outcome = session
        .run(std::io::stdin().lock(), std::io::stdout())
        .await?;
    info!(?outcome, "Session finished");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(&config.telemetry.log_filter) {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Session aborted");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
