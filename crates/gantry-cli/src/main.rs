//! Gantry CI CLI entrypoint.

use clap::Parser;

mod commands;
mod config;
mod handlers;

use commands::Commands;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about = "Gantry CI command-line interface", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = CliConfig::from_env()?;

    match cli.command {
        Commands::Enqueue {
            change,
            revision,
            job,
            recheck,
        } => handlers::enqueue(&config, change, revision, job, recheck).await?,
        Commands::Work { config: path, once } => handlers::work(&config, &path, once).await?,
        Commands::Publish => handlers::publish(&config).await?,
        Commands::Notify => handlers::notify(&config).await?,
        Commands::Dashboard { limit, output } => {
            handlers::dashboard(&config, limit, output).await?
        }
        Commands::Migrate => handlers::migrate(&config).await?,
    }

    Ok(())
}
