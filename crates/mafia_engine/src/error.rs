//! Error taxonomy for the game engine.
//!
//! Only [`SetupError`] blocks an operation outright. Everything else is
//! reported, logged, and play continues.

use crate::action::ActionKind;
use crate::phase::GamePhase;
use crate::role::Role;
use crate::roster::PlayerId;
use derive_more::{Display, Error, From};
use tracing::instrument;

/// The roster cannot start a game.
#[derive(Debug, Clone, Display, Error)]
#[display("Setup error: {} at {}:{}", message, file, line)]
pub struct SetupError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SetupError {
    /// Creates a new setup error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// A submitted action or operator input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ValidationError {
    /// The capability table does not allow this action.
    #[display("{player} ({role}) may not {action} during {phase}")]
    NotPermitted {
        /// Acting player.
        player: String,
        /// Their role.
        role: Role,
        /// Requested action.
        action: ActionKind,
        /// Phase the action was applied in.
        phase: GamePhase,
    },

    /// Only the final word may submit the night's kill.
    #[display("{player} does not have the final word tonight")]
    NotFinalWord {
        /// Acting player.
        player: String,
    },

    /// The named target is not a living player.
    #[display("{player} tried to {action} {target:?}, who is not a living player")]
    UnknownTarget {
        /// Acting player.
        player: String,
        /// Requested action.
        action: ActionKind,
        /// Name as given.
        target: String,
    },

    /// The doctor protected the same player last night.
    #[display("{player} cannot protect {target} two nights in a row")]
    RepeatSave {
        /// Acting doctor.
        player: String,
        /// Target protected last night.
        target: String,
    },

    /// The phase changed while the decision was being made.
    #[display("{player}'s action arrived after the phase ended")]
    Stale {
        /// Acting player.
        player: String,
    },

    /// Moderator tried to post an empty message.
    #[display("Message is empty")]
    EmptyMessage,
}

impl std::error::Error for ValidationError {}

/// The decision provider could not produce a turn.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ProviderError {
    /// No response within the turn budget.
    #[display("Decision provider timed out after {}ms", _0)]
    Timeout(u64),

    /// The call itself failed.
    #[display("Decision provider failed: {}", _0)]
    Transport(String),

    /// A response arrived but could not be understood.
    #[display("Decision provider returned a malformed response: {}", _0)]
    Malformed(String),
}

impl std::error::Error for ProviderError {}

/// An operation was attempted in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StateError {
    /// The game has not been started.
    #[display("Game has not started")]
    NotStarted,

    /// Start was requested on a running or finished game.
    #[display("Game is already running or finished; restart first")]
    AlreadyStarted,

    /// The game is over and no further phases exist.
    #[display("Game is already over")]
    GameEnded,

    /// A turn loop is running.
    #[display("A turn loop is in flight; wait until the table is idle")]
    TurnInFlight,

    /// The roster is frozen once the game has started.
    #[display("Roster is frozen while a game is running")]
    RosterFrozen,

    /// The controller task has shut down.
    #[display("Game controller is no longer running")]
    ControllerClosed,
}

impl std::error::Error for StateError {}

/// An action's target did not resolve to a living player at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{action} names {target:?}, who is not a living player")]
pub struct TargetNotFound {
    /// Player who submitted the action. `None` for moderator overrides.
    pub actor: Option<PlayerId>,
    /// Kind of action that was dropped.
    pub action: ActionKind,
    /// Name as submitted.
    pub target: String,
}

impl std::error::Error for TargetNotFound {}

/// Any engine error.
#[derive(Debug, Clone, Display, Error, From)]
pub enum GameError {
    /// See [`SetupError`].
    #[display("{_0}")]
    Setup(SetupError),
    /// See [`ValidationError`].
    #[display("{_0}")]
    Validation(ValidationError),
    /// See [`ProviderError`].
    #[display("{_0}")]
    Provider(ProviderError),
    /// See [`StateError`].
    #[display("{_0}")]
    State(StateError),
    /// See [`TargetNotFound`].
    #[display("{_0}")]
    TargetNotFound(TargetNotFound),
}
