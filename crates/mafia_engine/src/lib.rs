//! Mafia engine - orchestration for games of Mafia played by LLM agents
//!
//! A fixed roster of players moves through a cycle of phases. On each turn
//! the engine asks the player's decision provider what to say and do, checks
//! every requested action, and resolves the night and the vote at the phase
//! boundaries.
//!
//! # Architecture
//!
//! - **Session**: phase state machine and moderator operations
//! - **Scheduler**: turn order, visibility filtering and action validation
//! - **Resolution**: pure night, vote and win evaluation
//! - **Controller**: task that owns a session and serves operator commands
//! - **Providers**: LLM-backed, random and scripted players
//!
//! # Example
//!
//! ```no_run
//! use mafia_engine::{GameSession, RandomAgent, Role, SessionRules};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut session = GameSession::new(SessionRules::default());
//! session.add_player("Vito", Role::Don, RandomAgent::new("Vito", None))?;
//! session.add_player("Ann", Role::Detective, RandomAgent::new("Ann", None))?;
//! session.add_player("Ben", Role::Civilian, RandomAgent::new("Ben", None))?;
//! session.start().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod action;
mod config;
mod controller;
mod error;
mod events;
mod llm_agent;
mod llm_client;
mod message_log;
mod night;
mod phase;
mod prompts;
mod provider;
mod role;
mod roster;
mod scheduler;
mod session;
mod table;
mod voting;
mod win;

// Crate-level exports - Domain types
pub use action::{
    permitted_actions, ActionKind, ActionRequest, NightAction, NightActionBuffer, NightActionKind,
    Vote, VoteBuffer,
};
pub use message_log::{Message, MessageDraft, MessageLog, SenderKind, Sequence, Visibility};
pub use phase::{GamePhase, GameState};
pub use role::{Faction, Role};
pub use roster::{Player, PlayerId, Roster, RosterEntry};

// Crate-level exports - Resolution
pub use night::{resolve_night, CheckResult, NightOutcome};
pub use voting::{resolve_votes, VoteCount, VoteOutcome};
pub use win::{evaluate, GameStatus, RoleCount};

// Crate-level exports - Session and control
pub use controller::GameController;
pub use events::GameEvent;
pub use session::{GameSession, SessionRules, SessionSnapshot};

// Crate-level exports - Decision providers
pub use llm_agent::{parse_response, render_turn, LlmAgent};
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};
pub use prompts::RolePrompts;
pub use provider::{
    DecisionProvider, DecisionRequest, DecisionResponse, RandomAgent, ScriptedProvider, Step,
};

// Crate-level exports - Configuration and errors
pub use config::{ConfigError, GameConfig, LlmSettings, PlayerConfig, RulesConfig};
pub use error::{GameError, ProviderError, SetupError, StateError, TargetNotFound, ValidationError};
