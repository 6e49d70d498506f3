use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use ledgerline_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "ledgerline", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/ledgerline/ledgerline.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Create the staging and normalized tables
    ///
    /// Safe to run on an existing store: tables that already exist are left
    /// alone. Fails if a table exists with an incompatible shape.
    Init,
    /// Load a raw snapshot into the staging tables
    ///
    /// The snapshot is a .json or .toml file with `genres`, `artists`,
    /// `albums` and `tracks` arrays. Rows are appended in file order, which
    /// decides which duplicate wins during normalization.
    Load {
        /// Path to the snapshot file
        file: PathBuf,

        /// Empty the staging tables first
        #[arg(long)]
        replace: bool,
    },
    /// Run the schema → clean → normalize → guard pipeline
    ///
    /// Each stage runs in its own transaction. Orphaned, duplicate and
    /// invalid rows are removed, survivors are published to the normalized
    /// tables, and the integrity and audit hooks are installed.
    Migrate {
        /// Load this snapshot before migrating (default: snapshot_path from config)
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Show row counts and installed hooks
    Status,
    /// Show recent operation log entries
    Log {
        /// Number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the canonical form of a raw M/D/YY release date
    NormalizeDate {
        /// The raw date, e.g. 3/4/23
        raw: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file if it does not exist
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(),
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config(),
        },
        Commands::NormalizeDate { raw } => commands::normalize_date(&raw),
        command => run_against_store(command, cli.db).await,
    }
}

/// Commands that need the store.
async fn run_against_store(command: Commands, db: Option<PathBuf>) -> Result<()> {
    let config = Config::load_with_db_path(db)?;

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match command {
        Commands::Init => commands::run_init(&config.database_path),
        Commands::Load { file, replace } => {
            commands::run_load(&config.database_path, &file, replace)
        }
        Commands::Migrate { from } => {
            let snapshot = from.or_else(|| config.snapshot_path.clone());
            commands::run_migrate(&config, snapshot).await
        }
        Commands::Status => commands::show_status(&config.database_path),
        Commands::Log { limit } => commands::show_log(&config.database_path, limit),
        Commands::NormalizeDate { .. } | Commands::Config { .. } => Ok(()),
    }
}
