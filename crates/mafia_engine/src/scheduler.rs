//! Turn scheduling: who speaks, in what order, and what they may see.

use crate::action::{permitted_actions, ActionKind, ActionRequest, NightAction, NightActionKind, Vote};
use crate::error::{ProviderError, ValidationError};
use crate::events::GameEvent;
use crate::message_log::{MessageDraft, Visibility};
use crate::phase::GamePhase;
use crate::provider::{DecisionProvider, DecisionRequest, DecisionResponse};
use crate::role::Role;
use crate::roster::{Player, PlayerId};
use crate::session::SessionRules;
use crate::table::Table;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Decision providers keyed by the player they speak for.
pub(crate) type Providers = HashMap<PlayerId, Box<dyn DecisionProvider>>;

/// Runs the actor loop of each phase, one provider call at a time.
pub(crate) struct TurnScheduler {
    rng: StdRng,
    turn_timeout: Duration,
    day_rounds: usize,
    forbid_repeat_save: bool,
}

impl TurnScheduler {
    pub fn new(rules: &SessionRules) -> Self {
        let rng = match rules.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            turn_timeout: rules.turn_timeout,
            day_rounds: rules.day_discussion_rounds,
            forbid_repeat_save: rules.forbid_repeat_save,
        }
    }

    /// Runs every turn of the table's current phase.
    #[instrument(skip_all, fields(phase = %table.phase))]
    pub async fn run_phase(&mut self, table: &mut Table, providers: &Providers) {
        match table.phase {
            GamePhase::Night => self.run_night(table, providers).await,
            GamePhase::Actions => self.run_actions(table, providers).await,
            GamePhase::Day => self.run_day(table, providers).await,
            GamePhase::Voting => self.run_voting(table, providers).await,
            GamePhase::Welcome | GamePhase::Ended => debug!("No turns in this phase"),
        }
    }

    async fn run_night(&mut self, table: &mut Table, providers: &Providers) {
        let mut order: Vec<PlayerId> = table
            .roster
            .alive()
            .filter(|p| p.is_mafia_aligned())
            .map(Player::id)
            .collect();
        order.shuffle(&mut self.rng);
        table.night.discussion_order = order.clone();

        info!(speakers = order.len(), "Mafia discussion");
        for actor in order {
            self.take_turn(table, providers, actor, Visibility::MafiaChannel)
                .await;
        }
    }

    async fn run_actions(&mut self, table: &mut Table, providers: &Providers) {
        let final_word = final_word(table);
        table.night.final_word = final_word;

        if let Some(actor) = final_word {
            if let Some(player) = table.roster.get(actor) {
                let notice = format!("{} has the final word tonight.", player.name());
                table.post(MessageDraft::system(notice, Visibility::MafiaChannel));
            }
            self.take_turn(table, providers, actor, Visibility::MafiaChannel)
                .await;
        }

        let specialists: Vec<PlayerId> = table
            .roster
            .alive_with_role(Role::Detective)
            .chain(table.roster.alive_with_role(Role::Doctor))
            .map(Player::id)
            .collect();
        for actor in specialists {
            self.take_turn(table, providers, actor, Visibility::PrivateTo(actor))
                .await;
        }
    }

    async fn run_day(&mut self, table: &mut Table, providers: &Providers) {
        for round in 1..=self.day_rounds {
            table.post(MessageDraft::system(
                format!("Discussion round {} of {}.", round, self.day_rounds),
                Visibility::Public,
            ));
            let order = self.shuffled_alive(table);
            for actor in order {
                self.take_turn(table, providers, actor, Visibility::Public)
                    .await;
            }
        }
    }

    async fn run_voting(&mut self, table: &mut Table, providers: &Providers) {
        let order = self.shuffled_alive(table);
        for actor in order {
            self.take_turn(table, providers, actor, Visibility::Public)
                .await;
        }
    }

    fn shuffled_alive(&mut self, table: &Table) -> Vec<PlayerId> {
        let mut order: Vec<PlayerId> = table.roster.alive().map(Player::id).collect();
        order.shuffle(&mut self.rng);
        order
    }

    /// Consults one player's provider and applies what comes back.
    #[instrument(skip(self, table, providers), fields(phase = %table.phase))]
    async fn take_turn(
        &self,
        table: &mut Table,
        providers: &Providers,
        actor: PlayerId,
        visibility: Visibility,
    ) {
        let Some(player) = table.roster.get(actor).filter(|p| p.is_alive()).cloned() else {
            debug!("Skipping dead or unknown player");
            return;
        };
        let Some(provider) = providers.get(&actor) else {
            warn!(player = %player.name(), "No decision provider bound");
            return;
        };

        let phase = table.phase;
        let epoch = table.epoch;
        let request = DecisionRequest {
            player_name: player.name().to_string(),
            role: player.role(),
            phase,
            visible_messages: table.log.visible_to(&player),
            roster: table.roster.entries(),
            permitted_actions: permitted_actions(player.role(), phase).to_vec(),
        };
        table.emit(GameEvent::TurnStarted {
            player: player.name().to_string(),
            phase,
        });

        let started = Instant::now();
        let decision = self.decide(provider.as_ref(), &request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match decision {
            Ok(response) => response,
            Err(e) => {
                warn!(player = %player.name(), provider = %provider.label(), error = %e, "Turn passed");
                table.post(MessageDraft::system(
                    format!("{} passes.", player.name()),
                    visibility,
                ));
                return;
            }
        };
        debug!(
            player = %player.name(),
            elapsed_ms,
            actions = response.actions.len(),
            "Decision received"
        );

        let narrative = response.narrative.trim();
        if !narrative.is_empty() {
            table.post(
                MessageDraft::player(&player, narrative, visibility).with_elapsed_ms(elapsed_ms),
            );
        }

        for action in &response.actions {
            match self.validate(table, &player, epoch, action) {
                Ok(target) => accept(table, &player, visibility, action.kind, &target),
                Err(e) => {
                    warn!(player = %player.name(), action = %action, error = %e, "Action rejected");
                    table.post(MessageDraft::system(
                        format!("Action rejected: {}", e),
                        Visibility::PrivateTo(actor),
                    ));
                }
            }
        }
    }

    async fn decide(
        &self,
        provider: &dyn DecisionProvider,
        request: &DecisionRequest,
    ) -> Result<DecisionResponse, ProviderError> {
        match tokio::time::timeout(self.turn_timeout, provider.decide(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.turn_timeout.as_millis() as u64)),
        }
    }

    /// Checks an action against the table as it is now. Returns the target.
    fn validate(
        &self,
        table: &Table,
        player: &Player,
        epoch: u64,
        action: &ActionRequest,
    ) -> Result<Player, ValidationError> {
        let name = player.name().to_string();
        // Unreachable from `take_turn` while it holds `&mut Table` across the
        // provider call. Guards any caller that applies a response later.
        if table.epoch != epoch {
            return Err(ValidationError::Stale { player: name });
        }
        if !permitted_actions(player.role(), table.phase).contains(&action.kind) {
            return Err(ValidationError::NotPermitted {
                player: name,
                role: player.role(),
                action: action.kind,
                phase: table.phase,
            });
        }
        if action.kind == ActionKind::Kill && table.night.final_word != Some(player.id()) {
            return Err(ValidationError::NotFinalWord { player: name });
        }
        let Some(target) = table.roster.find_alive_by_name(&action.target) else {
            return Err(ValidationError::UnknownTarget {
                player: name,
                action: action.kind,
                target: action.target.clone(),
            });
        };
        if action.kind == ActionKind::Save
            && self.forbid_repeat_save
            && table.night.last_saves.get(&player.id()) == Some(&target.id())
        {
            return Err(ValidationError::RepeatSave {
                player: name,
                target: target.name().to_string(),
            });
        }
        Ok(target.clone())
    }
}

/// The Don if alive, else the first living mafia member of the last
/// discussion, else the first living mafia member at the table.
fn final_word(table: &Table) -> Option<PlayerId> {
    if let Some(don) = table.roster.alive_with_role(Role::Don).next() {
        return Some(don.id());
    }
    table
        .night
        .discussion_order
        .iter()
        .copied()
        .find(|id| {
            table
                .roster
                .get(*id)
                .is_some_and(|p| p.is_alive() && p.role() == Role::Mafia)
        })
        .or_else(|| table.roster.alive_with_role(Role::Mafia).next().map(Player::id))
}

/// Records an accepted action in the log and the matching buffer.
fn accept(
    table: &mut Table,
    player: &Player,
    visibility: Visibility,
    kind: ActionKind,
    target: &Player,
) {
    let request = ActionRequest::new(kind, target.name());
    let content = match kind {
        ActionKind::Kill => format!("chooses to kill {}.", target.name()),
        ActionKind::Check => format!("investigates {}.", target.name()),
        ActionKind::Save => format!("protects {}.", target.name()),
        ActionKind::Vote => format!("votes for {}.", target.name()),
    };
    let sequence = table.post(MessageDraft::player(player, content, visibility).with_action(request));

    match NightActionKind::try_from(kind) {
        Ok(night_kind) => {
            table
                .night_actions
                .submit(NightAction::new(player.id(), night_kind, target.name(), sequence));
        }
        Err(_) => {
            table.votes.cast(Vote::new(player.id(), target.name()));
        }
    }
    info!(player = %player.name(), action = %kind, target = %target.name(), "Action accepted");
}
