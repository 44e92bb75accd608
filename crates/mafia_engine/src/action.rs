//! First-class player actions and the buffers that collect them.
//!
//! Actions are requests, not effects. They are validated by the scheduler,
//! buffered here with latest-submission-wins semantics, and only turned into
//! state changes by the resolution engines at the end of a phase.

use crate::message_log::Sequence;
use crate::phase::GamePhase;
use crate::role::Role;
use crate::roster::PlayerId;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;
use tracing::{debug, instrument};

/// Kind of action a player can request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    /// Mafia night kill.
    Kill,
    /// Detective investigation.
    Check,
    /// Doctor protection.
    Save,
    /// Day vote to eliminate.
    Vote,
}

/// An action as returned by a decision provider: a kind and a target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct ActionRequest {
    /// What to do.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Display name of the player to do it to.
    #[new(into)]
    pub target: String,
}

impl std::fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.kind, self.target)
    }
}

/// Which actions `role` may submit during `phase`.
///
/// This table is the single source of truth for action legality.
pub fn permitted_actions(role: Role, phase: GamePhase) -> &'static [ActionKind] {
    match (phase, role) {
        (GamePhase::Actions, Role::Mafia | Role::Don) => &[ActionKind::Kill],
        (GamePhase::Actions, Role::Detective) => &[ActionKind::Check],
        (GamePhase::Actions, Role::Doctor) => &[ActionKind::Save],
        (GamePhase::Voting, _) => &[ActionKind::Vote],
        _ => &[],
    }
}

/// Night-only subset of [`ActionKind`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
pub enum NightActionKind {
    /// Kill.
    Kill,
    /// Check.
    Check,
    /// Save.
    Save,
}

impl TryFrom<ActionKind> for NightActionKind {
    type Error = ActionKind;

    fn try_from(kind: ActionKind) -> Result<Self, Self::Error> {
        match kind {
            ActionKind::Kill => Ok(NightActionKind::Kill),
            ActionKind::Check => Ok(NightActionKind::Check),
            ActionKind::Save => Ok(NightActionKind::Save),
            ActionKind::Vote => Err(kind),
        }
    }
}

/// A validated night action waiting for resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct NightAction {
    /// Who acted.
    pub actor: PlayerId,
    /// What they did.
    pub kind: NightActionKind,
    /// Target display name.
    #[new(into)]
    pub target: String,
    /// Log sequence of the message that recorded the submission.
    pub submitted_at: Sequence,
}

/// A validated day vote waiting for resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Vote {
    /// Who voted.
    pub voter: PlayerId,
    /// Display name of the player voted against.
    #[new(into)]
    pub target: String,
}

/// Night actions of the current night, one per actor and kind.
#[derive(Debug, Clone, Default)]
pub struct NightActionBuffer {
    actions: BTreeMap<(PlayerId, NightActionKind), NightAction>,
}

impl NightActionBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `action`, replacing any earlier action of the same kind by the
    /// same actor. Returns the replaced action.
    #[instrument(skip(self), fields(actor = %action.actor, kind = %action.kind))]
    pub fn submit(&mut self, action: NightAction) -> Option<NightAction> {
        let replaced = self.actions.insert((action.actor, action.kind), action);
        if replaced.is_some() {
            debug!("Night action overwritten by later submission");
        }
        replaced
    }

    /// Effective actions, ordered by submission.
    pub fn actions(&self) -> Vec<NightAction> {
        let mut actions: Vec<NightAction> = self.actions.values().cloned().collect();
        actions.sort_by_key(|a| a.submitted_at);
        actions
    }

    /// Number of effective actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

/// Votes of the current voting phase, one per voter.
#[derive(Debug, Clone, Default)]
pub struct VoteBuffer {
    votes: BTreeMap<PlayerId, Vote>,
}

impl VoteBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `vote`, replacing the voter's previous vote. Returns the
    /// replaced vote.
    #[instrument(skip(self), fields(voter = %vote.voter, target = %vote.target))]
    pub fn cast(&mut self, vote: Vote) -> Option<Vote> {
        let replaced = self.votes.insert(vote.voter, vote);
        if replaced.is_some() {
            debug!("Vote changed");
        }
        replaced
    }

    /// Effective votes, ordered by voter.
    pub fn votes(&self) -> Vec<Vote> {
        self.votes.values().cloned().collect()
    }

    /// Number of voters.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// True if nobody voted.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.votes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table() {
        assert_eq!(permitted_actions(Role::Don, GamePhase::Actions), [ActionKind::Kill]);
        assert_eq!(permitted_actions(Role::Doctor, GamePhase::Actions), [ActionKind::Save]);
        assert!(permitted_actions(Role::Civilian, GamePhase::Actions).is_empty());
        assert!(permitted_actions(Role::Mafia, GamePhase::Night).is_empty());
        assert!(permitted_actions(Role::Detective, GamePhase::Day).is_empty());
        for role in [Role::Civilian, Role::Mafia, Role::Don, Role::Detective, Role::Doctor] {
            assert_eq!(permitted_actions(role, GamePhase::Voting), [ActionKind::Vote]);
        }
    }

    #[test]
    fn test_later_night_action_overwrites() {
        let mut buffer = NightActionBuffer::new();
        let doc = PlayerId(5);
        buffer.submit(NightAction::new(doc, NightActionKind::Save, "Alice", 1));
        let replaced = buffer.submit(NightAction::new(doc, NightActionKind::Save, "Bob", 2));
        assert_eq!(replaced.map(|a| a.target), Some("Alice".to_string()));
        let actions = buffer.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].target, "Bob");
    }

    #[test]
    fn test_kinds_are_buffered_separately() {
        let mut buffer = NightActionBuffer::new();
        let actor = PlayerId(1);
        buffer.submit(NightAction::new(actor, NightActionKind::Kill, "Alice", 1));
        buffer.submit(NightAction::new(actor, NightActionKind::Check, "Bob", 2));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_latest_vote_wins() {
        let mut buffer = VoteBuffer::new();
        buffer.cast(Vote::new(PlayerId(1), "Alice"));
        buffer.cast(Vote::new(PlayerId(2), "Alice"));
        buffer.cast(Vote::new(PlayerId(1), "Bob"));
        let votes = buffer.votes();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].target, "Bob");
    }

    #[test]
    fn test_action_request_json_shape() {
        let action: ActionRequest =
            serde_json::from_str(r#"{"type": "vote", "target": "Alice"}"#).unwrap();
        assert_eq!(action, ActionRequest::new(ActionKind::Vote, "Alice"));
        assert!(NightActionKind::try_from(ActionKind::Vote).is_err());
    }
}
