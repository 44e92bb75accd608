//! The game session: phase state machine and moderator operations.

use crate::action::{ActionKind, NightActionKind};
use crate::error::{GameError, SetupError, StateError, TargetNotFound, ValidationError};
use crate::events::GameEvent;
use crate::message_log::{Message, MessageDraft, MessageLog, Sequence, Visibility};
use crate::night::resolve_night;
use crate::phase::{GamePhase, GameState};
use crate::provider::DecisionProvider;
use crate::role::{Faction, Role};
use crate::roster::{Player, PlayerId, Roster};
use crate::scheduler::{Providers, TurnScheduler};
use crate::table::Table;
use crate::voting::resolve_votes;
use crate::win::{evaluate, GameStatus};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Tunable rules of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRules {
    /// Budget for a single provider call.
    pub turn_timeout: Duration,
    /// Discussion passes per day.
    pub day_discussion_rounds: usize,
    /// Reject a doctor protecting the same player on consecutive nights.
    pub forbid_repeat_save: bool,
    /// Seed for turn order. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(60),
            day_discussion_rounds: 2,
            forbid_repeat_save: true,
            seed: None,
        }
    }
}

/// Read-only view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Lifecycle state.
    pub state: GameState,
    /// Current phase.
    pub phase: GamePhase,
    /// Every seat, roles included.
    pub players: Vec<Player>,
    /// Derived standing.
    pub status: GameStatus,
    /// Full transcript, all channels.
    pub messages: Vec<Message>,
}

/// One game of Mafia.
///
/// The session is the only writer of the roster, the log and the action
/// buffers. Providers only ever see copies.
pub struct GameSession {
    state: GameState,
    table: Table,
    providers: Providers,
    scheduler: TurnScheduler,
}

impl GameSession {
    /// Creates an empty session.
    #[instrument]
    pub fn new(rules: SessionRules) -> Self {
        info!("Creating game session");
        Self {
            state: GameState::Initial,
            table: Table::new(),
            providers: HashMap::new(),
            scheduler: TurnScheduler::new(&rules),
        }
    }

    /// Seats a player with the provider that will play them.
    #[instrument(skip(self, name, provider), fields(name = %name.as_ref()))]
    pub fn add_player(
        &mut self,
        name: impl AsRef<str>,
        role: Role,
        provider: impl DecisionProvider + 'static,
    ) -> Result<PlayerId, GameError> {
        if self.state != GameState::Initial {
            return Err(StateError::RosterFrozen.into());
        }
        let id = self.table.roster.add(name, role);
        self.providers.insert(id, Box::new(provider));
        Ok(id)
    }

    /// Streams [`GameEvent`]s to `events`.
    pub fn set_event_sender(&mut self, events: mpsc::UnboundedSender<GameEvent>) {
        self.table.set_events(events);
    }

    /// Lifecycle state.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.table.phase
    }

    /// The seats.
    pub fn roster(&self) -> &Roster {
        &self.table.roster
    }

    /// The transcript.
    pub fn log(&self) -> &MessageLog {
        &self.table.log
    }

    /// Current standing.
    pub fn status(&self) -> GameStatus {
        evaluate(&self.table.roster)
    }

    /// Copies everything an observer may want to show.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            phase: self.table.phase,
            players: self.table.roster.players().to_vec(),
            status: self.status(),
            messages: self.table.log.all().to_vec(),
        }
    }

    /// Starts the game and runs the first mafia discussion.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<GameStatus, GameError> {
        if self.state != GameState::Initial {
            return Err(StateError::AlreadyStarted.into());
        }
        self.validate_roster()?;

        info!(players = self.table.roster.len(), "Starting game");
        self.state = GameState::Started;
        self.table.enter_phase(GamePhase::Welcome);
        self.announce_roles();

        let status = evaluate(&self.table.roster);
        if let Some(victor) = status.victor {
            self.finish(victor);
            return Ok(status);
        }
        self.advance_phase().await
    }

    /// Moves to the next phase, plays it out and resolves it.
    #[instrument(skip(self), fields(from = %self.table.phase))]
    pub async fn advance_phase(&mut self) -> Result<GameStatus, GameError> {
        match self.state {
            GameState::Initial => return Err(StateError::NotStarted.into()),
            GameState::Ended => return Err(StateError::GameEnded.into()),
            GameState::Started => {}
        }

        let next = self.table.phase.next();
        self.enter_phase(next);
        self.scheduler.run_phase(&mut self.table, &self.providers).await;

        match next {
            GamePhase::Actions => self.apply_night(),
            GamePhase::Voting => self.apply_votes(),
            _ => {}
        }

        let status = evaluate(&self.table.roster);
        if let Some(victor) = status.victor {
            self.finish(victor);
        }
        Ok(status)
    }

    /// Throws the game away and returns to setup. Seats and roles stay.
    #[instrument(skip(self))]
    pub fn restart(&mut self) {
        info!(from = %self.state, "Restarting game");
        self.state = GameState::Initial;
        self.table.reset();
    }

    /// Moderator override: removes a living player.
    #[instrument(skip(self))]
    pub fn kill_player(&mut self, id: PlayerId) -> Result<GameStatus, GameError> {
        match self.state {
            GameState::Initial => return Err(StateError::NotStarted.into()),
            GameState::Ended => return Err(StateError::GameEnded.into()),
            GameState::Started => {}
        }
        let Some(player) = self.table.roster.get(id).filter(|p| p.is_alive()).cloned() else {
            warn!("Moderator kill names no living player");
            return Err(TargetNotFound {
                actor: None,
                action: ActionKind::Kill,
                target: id.to_string(),
            }
            .into());
        };

        self.table.roster.mark_dead(id);
        self.table.post(MessageDraft::system(
            format!(
                "The moderator removed {} from the game. They were {}.",
                player.name(),
                describe(player.role())
            ),
            Visibility::Public,
        ));

        let status = evaluate(&self.table.roster);
        if let Some(victor) = status.victor {
            self.finish(victor);
        }
        Ok(status)
    }

    /// Posts a public message from the moderator.
    #[instrument(skip(self, text))]
    pub fn send_moderator_message(&mut self, text: &str) -> Result<Sequence, GameError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        Ok(self.table.post(MessageDraft::moderator(text)))
    }

    /// Checks that the roster can start a game.
    pub fn validate_roster(&self) -> Result<(), SetupError> {
        let roster = &self.table.roster;
        if roster.is_empty() {
            return Err(SetupError::new("No players seated"));
        }

        let mut seen = HashSet::new();
        for player in roster.players() {
            if player.name().is_empty() {
                return Err(SetupError::new(format!("Player {} has no name", player.id())));
            }
            if !seen.insert(player.name().to_ascii_lowercase()) {
                return Err(SetupError::new(format!(
                    "Duplicate player name: {}",
                    player.name()
                )));
            }
            if !self.providers.contains_key(&player.id()) {
                return Err(SetupError::new(format!(
                    "No decision provider for {}",
                    player.name()
                )));
            }
        }

        if roster.alive_in(Faction::Mafia).next().is_none() {
            return Err(SetupError::new("At least one mafia or don is required"));
        }
        if roster.alive_in(Faction::Town).next().is_none() {
            return Err(SetupError::new("At least one town player is required"));
        }
        Ok(())
    }

    fn announce_roles(&mut self) {
        let names: Vec<String> = self
            .table
            .roster
            .players()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        self.table.post(MessageDraft::system(
            format!(
                "Welcome to Mafia. Tonight's players: {}. The town must find the mafia before it is too late.",
                names.join(", ")
            ),
            Visibility::Public,
        ));

        let players = self.table.roster.players().to_vec();
        for player in &players {
            self.table.post(MessageDraft::system(
                format!("You are {}.", describe(player.role())),
                Visibility::PrivateTo(player.id()),
            ));
        }

        let family: Vec<String> = players
            .iter()
            .filter(|p| p.is_mafia_aligned())
            .map(|p| format!("{} ({})", p.name(), p.role()))
            .collect();
        self.table.post(MessageDraft::system(
            format!("The family: {}.", family.join(", ")),
            Visibility::MafiaChannel,
        ));
    }

    fn enter_phase(&mut self, phase: GamePhase) {
        self.table.enter_phase(phase);
        let announcement = match phase {
            GamePhase::Night => format!(
                "Night {} falls. The mafia wake up and pick a victim.",
                self.table.night_number
            ),
            GamePhase::Actions => {
                "The mafia make their choice while the detective and the doctor go to work."
                    .to_string()
            }
            GamePhase::Day => format!(
                "Day {} begins. The town gathers to discuss.",
                self.table.day_number
            ),
            GamePhase::Voting => {
                "Time to vote. Every living player names who should leave.".to_string()
            }
            GamePhase::Welcome | GamePhase::Ended => return,
        };
        info!(phase = %phase, "Entering phase");
        self.table
            .post(MessageDraft::system(announcement, Visibility::Public));
    }

    /// Applies the night's outcome to the table.
    #[instrument(skip(self))]
    fn apply_night(&mut self) {
        let actions = self.table.night_actions.actions();
        let outcome = resolve_night(&actions, &self.table.roster);

        for missing in &outcome.not_found {
            self.report_not_found(missing);
        }

        for check in &outcome.checks {
            let verdict = if check.is_mafia { "is" } else { "is not" };
            self.table.post(MessageDraft::system(
                format!(
                    "Your investigation shows that {} {} a member of the mafia.",
                    check.target.name(),
                    verdict
                ),
                Visibility::PrivateTo(check.detective),
            ));
        }

        self.table.night.last_saves.clear();
        for save in actions.iter().filter(|a| a.kind == NightActionKind::Save) {
            let Some(target) = self.table.roster.find_alive_by_name(&save.target).cloned() else {
                continue;
            };
            self.table.night.last_saves.insert(save.actor, target.id());
            self.table.post(MessageDraft::system(
                format!("You protected {} tonight.", target.name()),
                Visibility::PrivateTo(save.actor),
            ));
        }

        match &outcome.killed {
            Some(victim) => {
                self.table.roster.mark_dead(victim.id());
                self.table.post(MessageDraft::system(
                    format!("{} was killed during the night.", victim.name()),
                    Visibility::Public,
                ));
            }
            None => {
                debug!(save_succeeded = outcome.save_succeeded, tied = outcome.kill_tied, "No death");
                self.table.post(MessageDraft::system(
                    "The town wakes up. Nobody died tonight.",
                    Visibility::Public,
                ));
            }
        }

        self.table.night_actions.clear();
        self.table.night.final_word = None;
    }

    /// Applies the vote's outcome to the table.
    #[instrument(skip(self))]
    fn apply_votes(&mut self) {
        let votes = self.table.votes.votes();
        let outcome = resolve_votes(&votes, &self.table.roster);

        for missing in &outcome.not_found {
            self.report_not_found(missing);
        }

        if !outcome.tally.is_empty() {
            let tally: Vec<String> = outcome
                .tally
                .iter()
                .map(|c| format!("{} {}", c.target.name(), c.count))
                .collect();
            self.table.post(MessageDraft::system(
                format!("Votes: {}.", tally.join(", ")),
                Visibility::Public,
            ));
        }

        let result = match &outcome.eliminated {
            Some(player) => {
                self.table.roster.mark_dead(player.id());
                format!(
                    "{} was voted out with {} vote{}. They were {}.",
                    player.name(),
                    outcome.top_count,
                    if outcome.top_count == 1 { "" } else { "s" },
                    describe(player.role())
                )
            }
            None if outcome.is_tie => format!(
                "The vote is tied at {}. Nobody is eliminated.",
                outcome.top_count
            ),
            None => "No votes were cast. Nobody is eliminated.".to_string(),
        };
        self.table
            .post(MessageDraft::system(result, Visibility::Public));
        self.table.votes.clear();
    }

    fn report_not_found(&mut self, missing: &TargetNotFound) {
        let Some(actor) = missing.actor else {
            return;
        };
        self.table.post(MessageDraft::system(
            format!(
                "Your {} on {} had no effect: they are not a living player.",
                missing.action, missing.target
            ),
            Visibility::PrivateTo(actor),
        ));
    }

    fn finish(&mut self, victor: Faction) {
        let survivors: Vec<String> = self
            .table
            .roster
            .alive_in(victor)
            .map(|p| p.name().to_string())
            .collect();
        info!(%victor, ?survivors, "Game over");

        self.state = GameState::Ended;
        self.table.enter_phase(GamePhase::Ended);
        self.table.post(MessageDraft::system(
            format!("{} wins! Survivors: {}.", victor, survivors.join(", ")),
            Visibility::Public,
        ));
        self.table.emit(GameEvent::GameOver { victor, survivors });
    }
}

/// Role as spoken by the narrator.
fn describe(role: Role) -> &'static str {
    match role {
        Role::Civilian => "a civilian",
        Role::Mafia => "a member of the mafia",
        Role::Don => "the Don",
        Role::Detective => "the detective",
        Role::Doctor => "the doctor",
    }
}
