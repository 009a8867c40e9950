mod check_cmd;
mod init_cmd;
mod replay_cmd;
mod terminal_output;
mod toggle_cmd;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use chanlogs_config::{config_dir, config_file_path, load_and_prepare, ChanlogsConfig};
use chanlogs_core::{MemoryToggleStore, ToggleLookup, ToggleStore};
use chanlogs_logging::init_logger;
use chanlogs_storage::SqliteToggleStore;

#[derive(Parser)]
#[command(name = "chanlogs")]
#[command(about = "chanlogs: IRC channel logger")]
#[command(version)]
struct Cli {
    /// Config file (default: $CHANLOGS_CONFIG_DIR/config.yaml or ~/.chanlogs/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record raw IRC lines from a file or stdin
    Replay {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
        /// Record events from spawned tasks instead of one at a time
        #[arg(long)]
        concurrent: bool,
    },
    /// Create the config file, log directory or database schema
    Init,
    /// Validate the configuration
    Check,
    /// Switch logging for a channel on or off
    Toggle {
        channel: String,
        #[arg(value_enum)]
        state: ToggleState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ToggleState {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    init_logger(config.logging.dir.as_deref(), &config.logging.level, config.logging.json);
    debug!(path = %config_path.display(), backend = ?config.backend, "Configuration loaded");

    match cli.command {
        Commands::Replay { file, concurrent } => {
            replay_cmd::run(&config, file.as_deref(), concurrent).await
        }
        Commands::Init => init_cmd::run(&config_path, &config).await,
        Commands::Check => check_cmd::run(&config_path, &config),
        Commands::Toggle { channel, state } => {
            toggle_cmd::run(&config, &channel, state == ToggleState::On)
        }
    }
}

/// One toggle store, viewed as the pipeline's lookup and the commands' store.
pub(crate) struct Toggles {
    pub lookup: Arc<dyn ToggleLookup>,
    pub store: Arc<dyn ToggleStore>,
}

impl Toggles {
    fn shared<T: ToggleStore + 'static>(store: T) -> Self {
        let store = Arc::new(store);
        Self { lookup: store.clone(), store }
    }
}

/// Durable when toggling is enabled, otherwise an in-memory store nothing
/// ever writes to.
pub(crate) fn open_toggles(config: &ChanlogsConfig) -> Result<Toggles> {
    if config.allow_toggle {
        Ok(Toggles::shared(open_toggle_db(&config.toggle_db_path())?))
    } else {
        Ok(Toggles::shared(MemoryToggleStore::new()))
    }
}

pub(crate) fn open_toggle_db(path: &Path) -> Result<SqliteToggleStore> {
    SqliteToggleStore::open(path)
        .with_context(|| format!("Failed to open toggle database {}", path.display()))
}
