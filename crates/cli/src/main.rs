mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cqlmigrate")]
#[command(about = "Schema migration runner for ScyllaDB/Cassandra clusters")]
struct Cli {
    /// Directory containing migration subdirectories
    #[arg(short = 'p', long = "path", env = "CQLMIGRATE_DIR", default_value = ".")]
    path: PathBuf,

    /// Cluster contact point, e.g. 127.0.0.1:9042
    #[arg(short = 'u', long = "db-url", env = "CQLMIGRATE_DB_URL")]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new migration directory with up.cql and down.cql
    Generate {
        /// Migration name
        name: String,
    },

    /// Apply all pending migrations in version order
    Up,

    /// Revert the most recently applied migration
    Down {
        /// Revert every applied migration instead of just the last one
        #[arg(long)]
        all: bool,
    },

    /// Show applied/pending state of every discovered migration
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { name } => commands::generate(&cli.path, &name),
        Commands::Up => commands::up(&cli.path, cli.db_url.as_deref()).await,
        Commands::Down { all } => commands::down(&cli.path, cli.db_url.as_deref(), all).await,
        Commands::Status => commands::status(&cli.path, cli.db_url.as_deref()).await,
    }
}
