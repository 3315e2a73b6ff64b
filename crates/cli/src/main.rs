//! Catalog CLI - product catalog client

mod commands;
mod config;
mod logging;

use anyhow::Result;
use catalog_http::client::{FileCookieJar, FileCredentialStore};
use catalog_http::{CatalogClient, ClientError};
use clap::{Parser, ValueEnum};
use commands::{Commands, LoginPrompt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Manage a product catalog from the command line")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the stored token, config file and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to <data-dir>/config.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding the config file
    #[arg(short = 'u', long, global = true, env = "CATALOG_BASE_URL")]
    base_url: Option<String>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = config::resolve_data_dir(cli.data_dir);
    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;
    debug!(data_dir = %data_dir.display(), "Starting catalog CLI");

    let client = match build_client(&data_dir, cli.config.as_deref(), cli.base_url) {
        Ok(client) => client,
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    };

    let outcome = if cli.timeout == 0 {
        Ok(cli.command.execute(&client).await)
    } else {
        tokio::time::timeout(
            Duration::from_secs(cli.timeout),
            cli.command.execute(&client),
        )
        .await
    };

    match outcome {
        Ok(Ok(())) => {
            info!("Command completed successfully");
        }
        Ok(Err(e)) => {
            report(&e);
            std::process::exit(1);
        }
        Err(_) => {
            error!("Command timed out after {} seconds", cli.timeout);
            eprintln!("Error: timed out after {} seconds", cli.timeout);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn build_client(
    data_dir: &std::path::Path,
    config_path: Option<&std::path::Path>,
    base_url: Option<String>,
) -> Result<CatalogClient> {
    let mut config = config::load_client_config(config_path, data_dir)?;
    if let Some(url) = base_url {
        config.base_url = url;
    }

    let store = FileCredentialStore::in_dir(data_dir);
    let cookies = FileCookieJar::in_dir(data_dir)?;
    debug!(
        token = %store.path().display(),
        cookies = %cookies.path().display(),
        "Using session files"
    );

    let client = CatalogClient::builder()
        .config(config)
        .credential_store(Arc::new(store))
        .cookie_jar(Arc::new(cookies))
        .navigator(Arc::new(LoginPrompt))
        .build()?;
    Ok(client)
}

fn report(e: &anyhow::Error) {
    error!("Command failed: {e:#}");
    match e.downcast_ref::<ClientError>() {
        Some(client_error) => {
            eprintln!("Error: {}", client_error.user_message());
            if let ClientError::Server { errors, .. } = client_error {
                for field_error in errors {
                    eprintln!("  - {field_error}");
                }
            }
        }
        None => eprintln!("Error: {e:#}"),
    }
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
