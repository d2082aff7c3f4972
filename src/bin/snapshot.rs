//! Run a snapshot backup or restore once, outside the server.

use clap::{Parser, Subcommand};

use portfolio_showcase::config::AppConfig;
use portfolio_showcase::logging;
use portfolio_showcase::snapshot::{store_from_config, SnapshotService};
use portfolio_showcase::Storage;

#[derive(Parser, Debug)]
#[command(name = "snapshot", about = "Back up or restore portfolio content")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the current content to the snapshot store
    Backup,
    /// Replace content with the stored snapshot
    Restore,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_cli();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    // Requires a real database; empty memory tables would overwrite the snapshot.
    let storage = Storage::connect_database(&config).await?;
    let store = store_from_config(&config.snapshot)
        .await?
        .ok_or("no snapshot store configured (set SNAPSHOT_KV_URL or SNAPSHOT_DIR)")?;
    let service = SnapshotService::new(storage.content, Some(store));

    match command {
        Command::Backup => {
            let snapshot = service.backup().await?;
            let counts = snapshot.counts();
            tracing::info!(
                timestamp = %snapshot.timestamp,
                certificates = counts.certificates,
                reviews = counts.reviews,
                contact_messages = counts.contact_messages,
                projects = counts.projects,
                "Backup written"
            );
        }
        Command::Restore => {
            let report = service.restore().await?;
            tracing::info!(
                backup_timestamp = %report.backup_timestamp,
                certificates = ?report.certificates,
                reviews = ?report.reviews,
                contact_messages = ?report.contact_messages,
                projects = ?report.projects,
                "Restore complete"
            );
        }
    }
    Ok(())
}
