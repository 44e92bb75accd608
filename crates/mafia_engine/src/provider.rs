//! Decision providers: whatever decides what a player says and does.
//!
//! The engine treats providers as untrusted. Every action they return is
//! validated by the scheduler before it has any effect.

use crate::action::{ActionKind, ActionRequest};
use crate::error::ProviderError;
use crate::message_log::Message;
use crate::phase::GamePhase;
use crate::role::Role;
use crate::roster::RosterEntry;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, instrument};

/// Everything a provider is told before a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Name of the player whose turn it is.
    pub player_name: String,
    /// That player's role.
    pub role: Role,
    /// Current phase.
    pub phase: GamePhase,
    /// Messages this player may see, oldest first.
    pub visible_messages: Vec<Message>,
    /// Every seat with its alive flag.
    pub roster: Vec<RosterEntry>,
    /// Actions the player may submit this turn.
    pub permitted_actions: Vec<ActionKind>,
}

impl DecisionRequest {
    /// Names of living players other than the requester.
    pub fn other_living(&self) -> Vec<&str> {
        self.roster
            .iter()
            .filter(|e| e.alive && !e.name.eq_ignore_ascii_case(&self.player_name))
            .map(|e| e.name.as_str())
            .collect()
    }
}

/// What a provider decided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Text spoken at the table. May be empty.
    #[serde(default)]
    pub narrative: String,
    /// Requested actions. May be empty.
    #[serde(default)]
    pub actions: Vec<ActionRequest>,
}

impl DecisionResponse {
    /// Says nothing and does nothing.
    pub fn pass() -> Self {
        Self::default()
    }

    /// Says `text`.
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            narrative: text.into(),
            actions: Vec::new(),
        }
    }

    /// Adds an action.
    pub fn with_action(mut self, kind: ActionKind, target: impl Into<String>) -> Self {
        self.actions.push(ActionRequest::new(kind, target));
        self
    }
}

/// Produces a player's narrative and actions for one turn.
#[async_trait::async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Decides what the player says and does.
    async fn decide(&self, request: &DecisionRequest) -> Result<DecisionResponse, ProviderError>;

    /// Short description for logs, e.g. the model name.
    fn label(&self) -> &str;
}

/// One scripted reaction.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer immediately.
    Respond(DecisionResponse),
    /// Fail the call.
    Fail(ProviderError),
    /// Sleep, then answer.
    Delay(Duration, DecisionResponse),
    /// Wait until notified, then answer.
    Gate(Arc<Notify>, DecisionResponse),
}

#[derive(Debug, Default)]
struct Script {
    by_phase: HashMap<GamePhase, VecDeque<Step>>,
    queue: VecDeque<Step>,
    requests: Vec<DecisionRequest>,
}

/// Provider that replays canned steps and records what it was asked.
///
/// Phase-specific steps are used first, then the general queue. When both
/// are empty the player passes. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    /// Creates a provider that always passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a step for the next call in any phase.
    pub fn then(self, step: Step) -> Self {
        self.lock().queue.push_back(step);
        self
    }

    /// Queues a response for the next call during `phase`.
    pub fn during(self, phase: GamePhase, response: DecisionResponse) -> Self {
        self.during_step(phase, Step::Respond(response))
    }

    /// Queues a step for the next call during `phase`.
    pub fn during_step(self, phase: GamePhase, step: Step) -> Self {
        self.lock().by_phase.entry(phase).or_default().push_back(step);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl DecisionProvider for ScriptedProvider {
    #[instrument(skip_all, fields(player = %request.player_name, phase = %request.phase))]
    async fn decide(&self, request: &DecisionRequest) -> Result<DecisionResponse, ProviderError> {
        let step = {
            let mut script = self.lock();
            script.requests.push(request.clone());
            let phased = script
                .by_phase
                .get_mut(&request.phase)
                .and_then(VecDeque::pop_front);
            phased.or_else(|| script.queue.pop_front())
        };

        match step {
            None => Ok(DecisionResponse::pass()),
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Delay(duration, response)) => {
                tokio::time::sleep(duration).await;
                Ok(response)
            }
            Some(Step::Gate(gate, response)) => {
                debug!("Waiting on gate");
                gate.notified().await;
                Ok(response)
            }
        }
    }

    fn label(&self) -> &str {
        "scripted"
    }
}

/// Offline player that picks random legal targets.
pub struct RandomAgent {
    name: String,
    rng: Mutex<StdRng>,
}

impl RandomAgent {
    /// Creates a random agent. Pass a seed for reproducible games.
    pub fn new(name: impl Into<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            name: name.into(),
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait::async_trait]
impl DecisionProvider for RandomAgent {
    #[instrument(skip_all, fields(agent = %self.name, phase = %request.phase))]
    async fn decide(&self, request: &DecisionRequest) -> Result<DecisionResponse, ProviderError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let others = request.other_living();

        let narrative = match request.phase {
            GamePhase::Night => "We should be careful about who we pick.".to_string(),
            GamePhase::Day => match others.choose(&mut *rng) {
                Some(name) => format!("I have a bad feeling about {}.", name),
                None => "I have nothing to add.".to_string(),
            },
            _ => String::new(),
        };

        let mut response = DecisionResponse::say(narrative);
        for kind in &request.permitted_actions {
            let target = match kind {
                ActionKind::Save => {
                    let mut pool = others.clone();
                    pool.push(request.player_name.as_str());
                    pool.choose(&mut *rng).map(|s| s.to_string())
                }
                _ => others.choose(&mut *rng).map(|s| s.to_string()),
            };
            if let Some(target) = target {
                debug!(action = %kind, target = %target, "Random choice");
                response = response.with_action(*kind, target);
            }
        }
        Ok(response)
    }

    fn label(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(phase: GamePhase, permitted: Vec<ActionKind>) -> DecisionRequest {
        DecisionRequest {
            player_name: "Ann".to_string(),
            role: Role::Doctor,
            phase,
            visible_messages: Vec::new(),
            roster: vec![
                RosterEntry {
                    name: "Ann".to_string(),
                    alive: true,
                },
                RosterEntry {
                    name: "Ben".to_string(),
                    alive: true,
                },
                RosterEntry {
                    name: "Cy".to_string(),
                    alive: false,
                },
            ],
            permitted_actions: permitted,
        }
    }

    #[tokio::test]
    async fn test_scripted_prefers_phase_steps() {
        let provider = ScriptedProvider::new()
            .then(Step::Respond(DecisionResponse::say("general")))
            .during(GamePhase::Voting, DecisionResponse::say("vote time"));

        let voting = provider.decide(&request(GamePhase::Voting, vec![])).await.unwrap();
        assert_eq!(voting.narrative, "vote time");
        let day = provider.decide(&request(GamePhase::Day, vec![])).await.unwrap();
        assert_eq!(day.narrative, "general");
        let empty = provider.decide(&request(GamePhase::Day, vec![])).await.unwrap();
        assert_eq!(empty, DecisionResponse::pass());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_random_agent_targets_living_players() {
        let agent = RandomAgent::new("Ann", Some(7));
        let response = agent
            .decide(&request(GamePhase::Voting, vec![ActionKind::Vote]))
            .await
            .unwrap();
        assert_eq!(response.actions, vec![ActionRequest::new(ActionKind::Vote, "Ben")]);
    }
}
