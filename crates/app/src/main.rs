//! SheetSync - ERP to spreadsheet synchronizer
//!
//! Main entry point for the `sheetsync` binary.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use sheetsync_app::utils::logging::init_tracing;
use sheetsync_app::{commands, AppContext};
use sheetsync_core::catalogs;
use sheetsync_domain::Config;
use sheetsync_infra::config;
use tracing::{error, info, warn};

/// Keeps Smartsheet sheets in sync with Bind ERP catalogs.
#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to environment, then the
    /// standard file locations
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the given catalogs once (all configured catalogs when omitted)
    Once {
        /// Catalog names, e.g. `clients invoices`
        catalogs: Vec<String>,
    },

    /// Sync every configured catalog on the configured interval until Ctrl-C
    Schedule,

    /// Probe the ERP and sheet APIs with the configured credentials
    Check,

    /// List the known catalog names
    Catalogs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before tracing so SHEETSYNC_LOG is honoured
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => warn!(error = %e, "Could not load .env file"),
    }

    let cli = Cli::parse();

    if let Commands::Catalogs = cli.command {
        for name in catalogs::names() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = load_config(cli.config)?;
    let context = AppContext::new(config).context("invalid configuration")?;

    match cli.command {
        Commands::Once { catalogs } => {
            commands::once::run(&context, &catalogs).await?;
        }
        Commands::Schedule => {
            commands::schedule::run(&context, shutdown_signal()).await?;
        }
        Commands::Check => {
            let status = commands::check::run(&context).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Catalogs => {}
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let loaded = match path {
        Some(path) => config::load_from_file(Some(path)),
        None => config::load(),
    };
    match loaded {
        Ok(config) => Ok(config),
        Err(err) => {
            error!(error = %err, category = err.category(), "Failed to load configuration");
            bail!("invalid configuration: {err}")
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for Ctrl-C; shutting down");
    }
}
