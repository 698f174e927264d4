//! wod-rae CLI
//!
//! Scrapes the RAE word of the day and sends it to Telegram chats.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wod_rae::{
    error::{AppError, Result, exit_code},
    models::{Config, parse_recipients},
    pipeline,
    utils::log::{LogLevel, LogMode},
};

/// wod-rae - RAE word of the day for Telegram
#[derive(Parser, Debug)]
#[command(
    name = "wod-rae",
    version,
    about = "Sends the RAE word of the day to Telegram chats"
)]
struct Cli {
    /// Path to the TOML configuration file (defaults are used if it does not exist)
    #[arg(short, long, env = "WOD_RAE_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level: debug, info, warn or error
    #[arg(long, env = "WOD_RAE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format: text or json
    #[arg(long, env = "WOD_RAE_LOG_MODE", global = true)]
    log_mode: Option<String>,

    /// Bot API token
    #[arg(long, env = "WOD_RAE_BOT_TOKEN", hide_env_values = true, global = true)]
    bot_token: Option<String>,

    /// Space-separated chat ids
    #[arg(long, env = "WOD_RAE_RECIPIENTS", global = true)]
    recipients: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Scrape the word of the day and send it to every recipient (default)
    Send,

    /// Scrape and print the formatted message without sending it
    Preview,

    /// Validate the configuration file
    Validate,
}

/// Install the log backend for the chosen mode.
fn init_logging(level: LogLevel, mode: LogMode) -> Result<()> {
    match mode {
        LogMode::Text => env_logger::Builder::new()
            .filter_level(level.to_filter())
            .format_timestamp_secs()
            .try_init()
            .map_err(|e| AppError::logging(e.to_string())),
        LogMode::Json => tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(level.as_str().to_lowercase()))
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| AppError::logging(e.to_string())),
    }
}

/// Resolve level and mode from flags/env first, then the config file.
fn setup_logging(cli: &Cli, config: Option<&Config>) -> Result<()> {
    let defaults = config.map(|c| c.logging.clone()).unwrap_or_default();
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        cli.log_level
            .as_deref()
            .unwrap_or(&defaults.level)
            .parse::<LogLevel>()?
    };
    let mode = cli
        .log_mode
        .as_deref()
        .unwrap_or(&defaults.mode)
        .parse::<LogMode>()?;
    init_logging(level, mode)
}

/// Cancel `cancel` on SIGINT or SIGTERM.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    log::warn!("Failed to listen for SIGTERM: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }

        log::warn!("Shutdown signal received, cancelling run");
        cancel.cancel();
    });
}

async fn run(cli: Cli, config: Config, cancel: CancellationToken) -> Result<()> {
    config.validate()?;

    match cli.command.unwrap_or(Command::Send) {
        Command::Send => {
            let recipients = parse_recipients(cli.recipients.as_deref().unwrap_or(""))?;
            let bot_token = cli
                .bot_token
                .filter(|t| !t.trim().is_empty())
                .ok_or(AppError::MissingToken)?;

            log::info!("wod-rae starting, {} recipients", recipients.len());
            let summary = pipeline::run_send(&config, &bot_token, &recipients, &cancel).await?;

            log::info!(
                "Sent '{}' ({} definitions) to {}/{} recipients in {} ms",
                summary.word,
                summary.definition_count,
                summary.delivered,
                summary.recipient_count,
                (summary.end_time - summary.start_time).num_milliseconds()
            );
        }

        Command::Preview => {
            let message = pipeline::run_preview(&config, &cancel).await?;
            println!("{message}");
        }

        Command::Validate => {
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    if let Err(e) = setup_logging(&cli, loaded.as_ref().ok()) {
        eprintln!("{e}");
        return ExitCode::from(exit_code::LOGGING as u8);
    }

    let config = match loaded {
        Ok(config) => config,
        Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "Config file {} not found. Using defaults.",
                cli.config.display()
            );
            Config::default()
        }
        Err(e) => {
            log::error!("Config load failed from {}: {}", cli.config.display(), e);
            return ExitCode::from(exit_code::CONFIG as u8);
        }
    };

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    match run(cli, config, cancel).await {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) if e.is_delivery() => {
            log::error!("Delivery failed: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
