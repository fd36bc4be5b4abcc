//! semdoc CLI
//!
//! Main entry point for the semdoc command-line tool.
//! Ingests a document into a local semantic store and queries it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ClearCommand, IngestCommand, QueryCommand, SearchCommand, StatusCommand};
use semdoc_core::config::{AppConfig, CliOverrides};
use semdoc_core::logging::{self, LogFormat};
use std::path::PathBuf;

/// semdoc - semantic document store
#[derive(Parser, Debug)]
#[command(name = "semdoc")]
#[command(about = "Index a document and retrieve its most relevant passages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SEMDOC_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SEMDOC_CONFIG")]
    config: Option<PathBuf>,

    /// Store name
    #[arg(short, long, global = true, env = "SEMDOC_STORE")]
    store: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "SEMDOC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and persist a document
    Ingest(IngestCommand),

    /// Retrieve the fragments relevant to a question
    Query(QueryCommand),

    /// List similar fragments with short previews
    Search(SearchCommand),

    /// Show store status and artifact sizes
    Status(StatusCommand),

    /// Remove the store
    Clear(ClearCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Flags pick the workspace and config file before the file is merged
    let config = AppConfig::load_with(CliOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        store: cli.store,
        log_level: cli.log_level,
        log_format: cli.log_format,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("semdoc starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Store: {}", config.store);

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Query(_) => "query",
        Commands::Search(_) => "search",
        Commands::Status(_) => "status",
        Commands::Clear(_) => "clear",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
        Commands::Clear(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
