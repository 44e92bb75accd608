//! Game phases and the transition table between them.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    /// Roster is being assembled.
    Initial,
    /// Game in progress.
    Started,
    /// A faction has won.
    Ended,
}

/// Phase of the day/night cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Opening announcement. Visited once.
    Welcome,
    /// Mafia discuss privately.
    Night,
    /// Final word kills, detective checks, doctor saves.
    Actions,
    /// Open discussion among the living.
    Day,
    /// Everyone votes someone out.
    Voting,
    /// Terminal.
    Ended,
}

impl GamePhase {
    /// The phase that follows `self`. `Ended` is absorbing.
    pub fn next(self) -> GamePhase {
        match self {
            GamePhase::Welcome => GamePhase::Night,
            GamePhase::Night => GamePhase::Actions,
            GamePhase::Actions => GamePhase::Day,
            GamePhase::Day => GamePhase::Voting,
            GamePhase::Voting => GamePhase::Night,
            GamePhase::Ended => GamePhase::Ended,
        }
    }
}
