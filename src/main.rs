use anyhow::Result;
use clap::Parser;

use biolinker::cli::{Cli, Commands};
use biolinker::config::{get_config, init_config_from};
use biolinker::runtime::modes;
use biolinker::system::logging::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    // Needs neither configuration nor logging
    if let Commands::GenerateConfig { output_path } = command {
        return modes::generate_config(output_path);
    }

    init_config_from(&cli.config);
    let config = get_config();

    let _log_guard = init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match command {
        Commands::Serve => modes::run_server(&config).await,
        Commands::CreateUser {
            email,
            name,
            password,
            stdin,
            admin,
        } => modes::create_user(&config, &email, name, password, stdin, admin)
            .await
            .map(|_| ()),
        Commands::GenerateConfig { .. } => Ok(()),
    }
}
