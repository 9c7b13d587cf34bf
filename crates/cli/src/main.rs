//! Cocochat CLI, the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `chat`    Run one exchange from the terminal
//! - `config`  Create or inspect the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cocochat_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "cocochat",
    about = "Cocochat: a streaming shopping-assistant chat service",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ~/.cocochat/config.toml)
    #[arg(short, long, global = true, env = "COCOCHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message and print the assistant's answer
    Chat {
        /// The message to send
        message: String,

        /// Ask the model for complete turns instead of a token stream
        #[arg(long)]
        no_stream: bool,

        /// Print the wire records exactly as the gateway would send them
        #[arg(long)]
        raw: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration with secrets masked
    Show,
    /// Print the config file path
    Path,
}

fn init_tracing(verbose: bool, local: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if local {
        builder.init();
    } else {
        builder.json().init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);

    // `config init` must work even when the existing file is broken.
    let loaded = AppConfig::load_with(Some(&config_path));
    let local = loaded.as_ref().map(AppConfig::is_local).unwrap_or(true);
    init_tracing(cli.verbose, local);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(loaded?, port).await?,
        Commands::Chat {
            message,
            no_stream,
            raw,
        } => commands::chat::run(loaded?, &message, !no_stream, raw).await?,
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config_cmd::init(&config_path, force)?,
            ConfigAction::Show => commands::config_cmd::show(&loaded?)?,
            ConfigAction::Path => commands::config_cmd::path(&config_path),
        },
    }

    Ok(())
}
