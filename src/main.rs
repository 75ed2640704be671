use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tget_lib::config::{config_path, init_config};
use tget_lib::downloader::MediaProxy;
use tget_lib::server::{self, AppState};
use tget_lib::{get_config, Config, Extractor, Pipeline};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Resolve Threads posts to direct media URLs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve {
        /// Listen port, overrides config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Extract media from a single post and print the result as JSON
    Extract {
        /// Threads post URL
        url: String,

        /// Read saved page markup instead of launching Chrome
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => run_server(load_config()?, port).await,
        Commands::Extract { url, html } => run_extract(load_config()?, url, html).await,
        Commands::Config { action } => run_config(action),
    }
}

fn load_config() -> Result<Config> {
    get_config().map_err(|e| anyhow!("failed to load config: {e}"))
}

fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let path = config_path();
            let written =
                init_config(&path, force).map_err(|e| anyhow!("failed to write config: {e}"))?;
            if written {
                println!("Wrote default config to {}", path.display());
            } else {
                println!("{} already exists, use --force to overwrite", path.display());
            }
        }
        ConfigAction::Show => {
            print!("{}", serde_yaml::to_string(&load_config()?)?);
        }
    }
    Ok(())
}

async fn run_server(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let launch_config = config.clone();
    let extractor = tokio::task::spawn_blocking(move || Extractor::launch(&launch_config))
        .await?
        .context("failed to start browser session")?;
    let extractor = Arc::new(extractor);

    let proxy = MediaProxy::new(
        Duration::from_secs(config.server.download_timeout_secs),
        &config.browser.user_agent,
    );
    let state = AppState::new(extractor.clone(), proxy, config.server.max_concurrent);

    server::serve(state, &config.server, shutdown_signal()).await?;

    info!("Shutting down browser session");
    match Arc::try_unwrap(extractor) {
        Ok(extractor) => extractor.close(),
        Err(_) => warn!("Extraction still in flight at shutdown; browser closes on exit"),
    }
    Ok(())
}

async fn run_extract(config: Config, url: String, html: Option<PathBuf>) -> Result<()> {
    let result = match html {
        Some(path) => {
            let markup = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Pipeline::from_config(&config).extract_markup(&url, &markup)?
        }
        None => {
            tokio::task::spawn_blocking(move || {
                let extractor = Extractor::launch(&config)?;
                let result = extractor.extract(&url);
                extractor.close();
                result
            })
            .await??
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
