//! Telco churn - main entry point

use clap::Parser;
use telco_churn::cli::{
    cmd_evaluate, cmd_preprocess, cmd_run, cmd_serve, cmd_train, cmd_tune, cmd_validate, Cli,
    Commands,
};
use telco_churn::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telco_churn=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.paths.into_config()?;

    match cli.command {
        Commands::Validate => cmd_validate(&Pipeline::new(config))?,
        Commands::Preprocess => cmd_preprocess(&Pipeline::new(config))?,
        Commands::Tune(args) => cmd_tune(&Pipeline::new(config), &args)?,
        Commands::Train(args) => cmd_train(&Pipeline::new(config), &args)?,
        Commands::Evaluate => cmd_evaluate(&Pipeline::new(config))?,
        Commands::Run { skip_tune, tune, train } => {
            cmd_run(&Pipeline::new(config), skip_tune, &tune, &train)?
        }
        Commands::Serve { host, port } => cmd_serve(&config, host, port).await?,
    }

    Ok(())
}
