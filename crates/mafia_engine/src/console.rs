//! Line-based operator console.

use mafia_engine::{GameController, GameError, GameEvent, SessionSnapshot};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Advance one phase.
    Next,
    /// Toggle auto-advance.
    Auto(bool),
    /// Remove a player by name.
    Kill(String),
    /// Post a moderator message.
    Say(String),
    /// Print the standings.
    Status,
    /// Start the game.
    Start,
    /// Reset to setup.
    Restart,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        match (word.to_ascii_lowercase().as_str(), rest) {
            ("next" | "n", "") => Ok(Self::Next),
            ("auto", "on") => Ok(Self::Auto(true)),
            ("auto", "off") => Ok(Self::Auto(false)),
            ("kill", name) if !name.is_empty() => Ok(Self::Kill(name.to_string())),
            ("say", text) if !text.is_empty() => Ok(Self::Say(text.to_string())),
            ("status", "") => Ok(Self::Status),
            ("start", "") => Ok(Self::Start),
            ("restart", "") => Ok(Self::Restart),
            ("help" | "?", "") => Ok(Self::Help),
            ("quit" | "exit", "") => Ok(Self::Quit),
            _ => Err(format!("Unknown command: {:?}. Type 'help'.", line)),
        }
    }
}

const HELP: &str = "Commands: next, auto on|off, kill <name>, say <text>, status, start, restart, quit";

/// Prints game events to stdout until the channel closes.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<GameEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            GameEvent::MessagePosted(message) => println!("{}", message.transcript_line()),
            GameEvent::PhaseChanged(phase) => println!("\n== {} ==", phase),
            GameEvent::TurnStarted { player, phase } => debug!(%player, %phase, "Turn started"),
            GameEvent::GameOver { victor, .. } => println!("\n*** Game over: {} wins ***", victor),
            GameEvent::Restarted => println!("\n== Game reset =="),
        }
    }
}

/// Reads operator commands from stdin and forwards them to `controller`.
pub async fn run(controller: GameController) -> anyhow::Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("! {}", e);
                continue;
            }
        };
        info!(?command, "Operator command");

        match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Next => {
                let controller = controller.clone();
                tokio::spawn(async move { report(controller.advance().await.map(|_| ())) });
            }
            ConsoleCommand::Start => {
                let controller = controller.clone();
                tokio::spawn(async move { report(controller.start().await.map(|_| ())) });
            }
            ConsoleCommand::Auto(enabled) => report(controller.set_auto_advance(enabled).await),
            ConsoleCommand::Say(text) => report(controller.moderator_message(text).await.map(|_| ())),
            ConsoleCommand::Restart => report(controller.restart().await),
            ConsoleCommand::Status => match controller.snapshot().await {
                Ok(snapshot) => print_status(&snapshot),
                Err(e) => report(Err(e)),
            },
            ConsoleCommand::Kill(name) => report(kill_by_name(&controller, &name).await),
        }
    }
    Ok(())
}

async fn kill_by_name(controller: &GameController, name: &str) -> Result<(), GameError> {
    let snapshot = controller.snapshot().await?;
    let Some(player) = snapshot
        .players
        .iter()
        .find(|p| p.name().eq_ignore_ascii_case(name))
    else {
        println!("! No player named {:?}", name);
        return Ok(());
    };
    controller.kill_player(player.id()).await?;
    Ok(())
}

fn print_status(snapshot: &SessionSnapshot) {
    println!("State: {}, phase: {}", snapshot.state, snapshot.phase);
    println!("{}", snapshot.status.summary());
    for player in &snapshot.players {
        let mark = if player.is_alive() { "alive" } else { "dead" };
        println!("  {} {} ({}, {})", player.id(), player.name(), player.role(), mark);
    }
}

fn report(result: Result<(), GameError>) {
    if let Err(e) = result {
        warn!(error = %e, "Command failed");
        println!("! {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("next".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Next));
        assert_eq!("AUTO on".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Auto(true)));
        assert_eq!("kill  Vito ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Kill("Vito".to_string())));
        assert_eq!(
            "say Settle down, everyone.".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Say("Settle down, everyone.".to_string()))
        );
        assert!("kill".parse::<ConsoleCommand>().is_err());
        assert!("auto maybe".parse::<ConsoleCommand>().is_err());
    }
}
