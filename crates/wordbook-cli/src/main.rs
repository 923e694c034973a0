//! Wordbook CLI
//!
//! Command-line interface and HTTP server for the wordbook dictionary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wordbook_core::{Config, Store, StoreError};

mod commands;
mod output;
mod server;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "wordbook")]
#[command(about = "Wordbook - a file-backed word/definition dictionary")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Dictionary file to use (overrides config)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Config file to use instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a word, or replace its definition
    Add {
        /// The word
        word: String,
        /// Its definition
        definition: String,
    },
    /// Show the definition of a word
    Get {
        /// The word
        word: String,
    },
    /// Remove a word
    #[command(alias = "rm")]
    Remove {
        /// The word
        word: String,
    },
    /// List all entries, sorted by word
    #[command(alias = "ls")]
    List,
    /// Show dictionary file and entry count
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Serve the dictionary over HTTP
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_file, bind_addr, op_timeout_secs, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    if let Some(file) = cli.file {
        config.data_file = file;
    }

    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    init_logging(&config, default_level);

    let store = match Store::open_with_config(config.clone()).await {
        Ok(store) => store,
        Err(e) => {
            if let StoreError::Storage(ref storage_err) = e {
                if let Some(hint) = storage_err.recovery_suggestion() {
                    eprintln!("Hint: {}", hint);
                }
            }
            return Err(e)
                .with_context(|| format!("Failed to open dictionary {:?}", config.data_file));
        }
    };

    match cli.command {
        Commands::Add { word, definition } => {
            commands::entry::add(&store, word, definition, &output).await
        }
        Commands::Get { word } => commands::entry::get(&store, word, &output),
        Commands::Remove { word } => commands::entry::remove(&store, word, &output).await,
        Commands::List => commands::entry::list(&store, &output),
        Commands::Status => commands::status::show(&store, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            server::serve(store, &bind_addr).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging to stderr
///
/// RUST_LOG wins when set; otherwise the configured level (or `default_level`)
/// applies to the wordbook crates and the HTTP trace layer.
fn init_logging(config: &Config, default_level: &str) {
    let level = config.log_level.as_deref().unwrap_or(default_level);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wordbook_core={level},wordbook_cli={level},tower_http={level}",
            level = level
        ))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
