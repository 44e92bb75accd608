//! Mafia engine - command-line game runner.

#![warn(missing_docs)]

mod cli;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use mafia_engine::{GameConfig, GameController};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    initialize_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Play {
            config,
            auto,
            offline,
        } => play(&config, auto, offline).await,
        Command::Check { config } => check(&config),
    }
}

/// Logs go to stderr so the transcript on stdout stays readable.
fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Play a game from a config file
#[instrument(skip(config), fields(config_path = %config.display()))]
async fn play(config: &Path, auto: bool, offline: bool) -> Result<()> {
    let config = GameConfig::from_file(config)?;
    let mut session = config
        .build_session(offline)
        .context("Failed to seat players")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    session.set_event_sender(events_tx);
    let printer = tokio::spawn(console::print_events(events_rx));

    let controller = GameController::spawn(session);
    if auto {
        controller.set_auto_advance(true).await?;
    }
    info!("Starting game");
    {
        let controller = controller.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.start().await {
                println!("! {}", e);
            }
        });
    }

    console::run(controller).await?;
    printer.abort();
    Ok(())
}

/// Validate a config file and print the table
#[instrument(skip_all, fields(config_path = %config.display()))]
fn check(config: &Path) -> Result<()> {
    let config = GameConfig::from_file(config)?;
    let session = config.build_session(true)?;
    session.validate_roster()?;

    println!(
        "Provider: {:?}, model: {}",
        config.llm().provider(),
        config.llm().model()
    );
    for player in config.players() {
        println!(
            "  {} ({}){}",
            player.name(),
            player.role(),
            player
                .model()
                .as_ref()
                .map(|m| format!(" using {}", m))
                .unwrap_or_default()
        );
    }
    println!("{}", session.status().summary());
    println!("Config OK");
    Ok(())
}
