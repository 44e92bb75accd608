//! Events streamed to observers while a game runs.

use crate::message_log::Message;
use crate::phase::GamePhase;
use crate::role::Faction;

/// Something observers may want to render.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// A message was appended to the log.
    MessagePosted(Message),
    /// The session entered a new phase.
    PhaseChanged(GamePhase),
    /// A player's decision provider is being consulted.
    TurnStarted {
        /// Acting player.
        player: String,
        /// Phase of the turn.
        phase: GamePhase,
    },
    /// A faction won.
    GameOver {
        /// Winning faction.
        victor: Faction,
        /// Living members of the winning faction.
        survivors: Vec<String>,
    },
    /// The session was reset to its initial state.
    Restarted,
}
