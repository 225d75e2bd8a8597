mod cli;

use clap::Parser;
use cli::{handle_demo, handle_deploy, handle_execute, handle_identity, init_logging, Cli, Commands};
use creds_client::ClientConfig;
use creds_types::CredsResult;

#[tokio::main]
async fn main() -> CredsResult<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = ClientConfig::load(&config_path)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    init_logging(&cli, &config.logging)?;

    match cli.command {
        Commands::Identity { action } => {
            handle_identity(action, &config.identities_dir(), &cli.format).await?;
        }
        Commands::Deploy { action } => {
            handle_deploy(action, &mut config, &config_path, &cli.format).await?;
        }
        Commands::Execute { cred_id, admin, signal } => {
            handle_execute(&config, &cred_id, admin.as_deref(), &signal, &cli.format).await?;
        }
        Commands::Demo { cred_id, signal, depth } => {
            handle_demo(&config, &cred_id, &signal, depth, &cli.format).await?;
        }
    }

    Ok(())
}
