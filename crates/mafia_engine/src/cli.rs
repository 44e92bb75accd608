//! Command-line interface for mafia_engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mafia engine - run games of Mafia between LLM agents
#[derive(Parser, Debug)]
#[command(name = "mafia_engine")]
#[command(about = "Orchestrates games of Mafia played by LLM agents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a game with an operator console on stdin
    Play {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "game.toml")]
        config: PathBuf,

        /// Advance phases automatically until the game ends
        #[arg(long)]
        auto: bool,

        /// Use random offline players instead of an LLM
        #[arg(long)]
        offline: bool,
    },

    /// Validate a game configuration without playing
    Check {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "game.toml")]
        config: PathBuf,
    },
}
