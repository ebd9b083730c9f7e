use clap::{Parser, Subcommand};
use sams_api::migrator::{rollback_migration, run_migration};
use tracing::info;

#[derive(Parser)]
#[command(name = "migration", about = "Apply or roll back the SAMS database schema", version)]
struct Cli {
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://sams.db?mode=rwc",
        help = "Database connection URL"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    info!("Connecting to database: {}", cli.database_url);

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => run_migration(&cli.database_url).await?,
        Command::Down { steps } => rollback_migration(&cli.database_url, steps).await?,
    }

    info!("Migration completed successfully");
    Ok(())
}
