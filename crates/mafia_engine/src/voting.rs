//! Day vote resolution.

use crate::action::{ActionKind, Vote};
use crate::error::TargetNotFound;
use crate::roster::{Player, PlayerId, Roster};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Votes received by one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCount {
    /// Player voted against.
    pub target: Player,
    /// Number of distinct voters.
    pub count: usize,
}

/// Outcome of a voting phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Player voted out, if there was a strict plurality.
    pub eliminated: Option<Player>,
    /// True when two or more players shared the most votes.
    pub is_tie: bool,
    /// Highest vote count. Zero if no valid votes were cast.
    pub top_count: usize,
    /// Per-target counts, most votes first.
    pub tally: Vec<VoteCount>,
    /// Votes dropped because their target was not a living player.
    pub not_found: Vec<TargetNotFound>,
}

/// Tallies votes and decides who is eliminated.
///
/// A voter appearing more than once counts once, with their last vote.
#[instrument(skip_all, fields(votes = votes.len()))]
pub fn resolve_votes(votes: &[Vote], roster: &Roster) -> VoteOutcome {
    let mut latest: BTreeMap<PlayerId, &Vote> = BTreeMap::new();
    for vote in votes {
        latest.insert(vote.voter, vote);
    }

    let mut outcome = VoteOutcome::default();
    let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for vote in latest.values() {
        match roster.find_alive_by_name(&vote.target) {
            Some(target) => *counts.entry(target.id()).or_default() += 1,
            None => {
                warn!(voter = %vote.voter, target = %vote.target, "Vote target not found");
                outcome.not_found.push(TargetNotFound {
                    actor: Some(vote.voter),
                    action: ActionKind::Vote,
                    target: vote.target.clone(),
                });
            }
        }
    }

    outcome.tally = counts
        .iter()
        .filter_map(|(id, count)| {
            roster.get(*id).map(|target| VoteCount {
                target: target.clone(),
                count: *count,
            })
        })
        .collect();
    outcome
        .tally
        .sort_by(|a, b| b.count.cmp(&a.count).then(a.target.id().cmp(&b.target.id())));

    outcome.top_count = outcome.tally.first().map(|c| c.count).unwrap_or(0);
    let leaders = outcome
        .tally
        .iter()
        .filter(|c| c.count == outcome.top_count)
        .count();

    if outcome.top_count >= 1 {
        if leaders == 1 {
            outcome.eliminated = outcome.tally.first().map(|c| c.target.clone());
        } else {
            outcome.is_tie = true;
        }
    }

    info!(
        eliminated = ?outcome.eliminated.as_ref().map(Player::name),
        top_count = outcome.top_count,
        is_tie = outcome.is_tie,
        "Votes resolved"
    );
    outcome
}
