use clap::Parser;
use eyre::Result;
use scripts::{cli::Cli, utils::load_env_file};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Arguments may be sourced from the env file, so it is loaded before the
    // final parse
    let env_file = Cli::try_parse().map(|cli| cli.env_file).unwrap_or_else(|_| ".env".into());
    load_env_file(&env_file)?;

    let Cli {
        network, command, ..
    } = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .pretty()
        .init();

    command.run(&network).await?;
    Ok(())
}
