//! Night action resolution.
//!
//! [`resolve_night`] is pure: it reads the roster and the night's actions
//! and describes what happened. The session applies the result.

use crate::action::{ActionKind, NightAction, NightActionKind};
use crate::error::TargetNotFound;
use crate::roster::{Player, PlayerId, Roster};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// What a detective learned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Investigating player.
    pub detective: PlayerId,
    /// Investigated player.
    pub target: Player,
    /// Reported alignment. Always false for the Don.
    pub is_mafia: bool,
}

/// Outcome of one night.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightOutcome {
    /// Player who dies tonight.
    pub killed: Option<Player>,
    /// Player the mafia went after, whether or not they died.
    pub kill_target: Option<Player>,
    /// True when several targets shared the most kill votes.
    pub kill_tied: bool,
    /// Player the doctor protected.
    pub saved: Option<Player>,
    /// Doctor whose save was effective.
    pub saved_by: Option<PlayerId>,
    /// True when the protection cancelled the kill.
    pub save_succeeded: bool,
    /// Detective results, in submission order.
    pub checks: Vec<CheckResult>,
    /// Actions dropped because their target was not a living player.
    pub not_found: Vec<TargetNotFound>,
}

/// Resolves a night's effective actions against the roster.
///
/// - The kill goes to the target named by the most distinct actors. A tie
///   for the most means nobody is killed.
/// - The most recently submitted save is the effective one. If it names the
///   kill target, the kill is cancelled.
/// - A check reports the target's alignment, except that a Don always reads
///   as innocent.
/// - Actions naming someone who is not alive are reported in `not_found`
///   and otherwise ignored.
#[instrument(skip_all, fields(actions = actions.len()))]
pub fn resolve_night(actions: &[NightAction], roster: &Roster) -> NightOutcome {
    let mut outcome = NightOutcome::default();

    let kills = latest_per_actor(actions, NightActionKind::Kill);
    let saves = latest_per_actor(actions, NightActionKind::Save);
    let checks = latest_per_actor(actions, NightActionKind::Check);

    // Kill: plurality of distinct actors per target.
    let mut tally: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for action in &kills {
        if let Some(target) = resolve_target(action, roster, &mut outcome.not_found) {
            *tally.entry(target.id()).or_default() += 1;
        }
    }
    let top = tally.values().copied().max().unwrap_or(0);
    let leaders: Vec<PlayerId> = tally
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(id, _)| *id)
        .collect();
    match leaders.as_slice() {
        [single] => outcome.kill_target = roster.get(*single).cloned(),
        [] => debug!("No kill submitted"),
        _ => {
            info!(tied = leaders.len(), votes = top, "Kill vote tied, nobody dies");
            outcome.kill_tied = true;
        }
    }

    // Save: most recent submission wins.
    if let Some(action) = saves
        .iter()
        .filter(|a| {
            let found = roster.find_alive_by_name(&a.target).is_some();
            if !found {
                outcome.not_found.push(not_found(a));
            }
            found
        })
        .max_by_key(|a| a.submitted_at)
    {
        outcome.saved = roster.find_alive_by_name(&action.target).cloned();
        outcome.saved_by = Some(action.actor);
    }

    outcome.save_succeeded = match (&outcome.kill_target, &outcome.saved) {
        (Some(kill), Some(save)) => kill.id() == save.id(),
        _ => false,
    };
    if !outcome.save_succeeded {
        outcome.killed = outcome.kill_target.clone();
    }

    for action in &checks {
        if let Some(target) = resolve_target(action, roster, &mut outcome.not_found) {
            outcome.checks.push(CheckResult {
                detective: action.actor,
                is_mafia: target.role().reads_as_mafia(),
                target: target.clone(),
            });
        }
    }

    info!(
        killed = ?outcome.killed.as_ref().map(Player::name),
        saved = ?outcome.saved.as_ref().map(Player::name),
        save_succeeded = outcome.save_succeeded,
        checks = outcome.checks.len(),
        dropped = outcome.not_found.len(),
        "Night resolved"
    );
    outcome
}

/// Keeps each actor's latest action of `kind`, ordered by submission.
fn latest_per_actor(actions: &[NightAction], kind: NightActionKind) -> Vec<&NightAction> {
    let mut latest: BTreeMap<PlayerId, &NightAction> = BTreeMap::new();
    for action in actions.iter().filter(|a| a.kind == kind) {
        match latest.get(&action.actor) {
            Some(existing) if existing.submitted_at > action.submitted_at => {}
            _ => {
                latest.insert(action.actor, action);
            }
        }
    }
    let mut effective: Vec<&NightAction> = latest.into_values().collect();
    effective.sort_by_key(|a| a.submitted_at);
    effective
}

fn resolve_target<'a>(
    action: &NightAction,
    roster: &'a Roster,
    not_found_out: &mut Vec<TargetNotFound>,
) -> Option<&'a Player> {
    let target = roster.find_alive_by_name(&action.target);
    if target.is_none() {
        not_found_out.push(not_found(action));
    }
    target
}

fn not_found(action: &NightAction) -> TargetNotFound {
    let kind = match action.kind {
        NightActionKind::Kill => ActionKind::Kill,
        NightActionKind::Check => ActionKind::Check,
        NightActionKind::Save => ActionKind::Save,
    };
    warn!(actor = %action.actor, action = %kind, target = %action.target, "Night action target not found");
    TargetNotFound {
        actor: Some(action.actor),
        action: kind,
        target: action.target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    struct Table {
        roster: Roster,
        mafia: PlayerId,
        don: PlayerId,
        detective: PlayerId,
        doctor: PlayerId,
    }

    fn table() -> Table {
        let mut roster = Roster::new();
        let mafia = roster.add("Mia", Role::Mafia);
        let don = roster.add("Vito", Role::Don);
        let detective = roster.add("Dee", Role::Detective);
        let doctor = roster.add("Doc", Role::Doctor);
        roster.add("Cal", Role::Civilian);
        roster.add("Cora", Role::Civilian);
        Table {
            roster,
            mafia,
            don,
            detective,
            doctor,
        }
    }

    fn action(actor: PlayerId, kind: NightActionKind, target: &str, at: u64) -> NightAction {
        NightAction::new(actor, kind, target, at)
    }

    #[test]
    fn test_single_kill() {
        let t = table();
        let outcome = resolve_night(&[action(t.don, NightActionKind::Kill, "Cal", 1)], &t.roster);
        assert_eq!(outcome.killed.map(|p| p.name().to_string()), Some("Cal".into()));
        assert!(!outcome.save_succeeded);
    }

    #[test]
    fn test_save_cancels_kill() {
        let t = table();
        let outcome = resolve_night(
            &[
                action(t.don, NightActionKind::Kill, "Cal", 1),
                action(t.doctor, NightActionKind::Save, "cal", 2),
            ],
            &t.roster,
        );
        assert!(outcome.killed.is_none());
        assert!(outcome.save_succeeded);
        assert_eq!(outcome.saved_by, Some(t.doctor));
    }

    #[test]
    fn test_save_on_kill_target_prevents_death_for_every_target() {
        let t = table();
        for target in t.roster.players() {
            let outcome = resolve_night(
                &[
                    action(t.mafia, NightActionKind::Kill, target.name(), 1),
                    action(t.doctor, NightActionKind::Save, target.name(), 2),
                ],
                &t.roster,
            );
            assert!(outcome.killed.is_none(), "{} should survive", target.name());
        }
    }

    #[test]
    fn test_last_save_is_effective() {
        let t = table();
        let outcome = resolve_night(
            &[
                action(t.don, NightActionKind::Kill, "Cal", 1),
                action(t.doctor, NightActionKind::Save, "Cal", 2),
                action(t.doctor, NightActionKind::Save, "Cora", 3),
            ],
            &t.roster,
        );
        assert_eq!(outcome.saved.map(|p| p.name().to_string()), Some("Cora".into()));
        assert_eq!(outcome.killed.map(|p| p.name().to_string()), Some("Cal".into()));
        assert!(!outcome.save_succeeded);
    }

    #[test]
    fn test_kill_tie_means_no_kill() {
        let t = table();
        let outcome = resolve_night(
            &[
                action(t.mafia, NightActionKind::Kill, "Cal", 1),
                action(t.don, NightActionKind::Kill, "Cora", 2),
            ],
            &t.roster,
        );
        assert!(outcome.killed.is_none());
        assert!(outcome.kill_tied);
    }

    #[test]
    fn test_kill_plurality_counts_actors() {
        let mut roster = Roster::new();
        let a = roster.add("A", Role::Mafia);
        let b = roster.add("B", Role::Mafia);
        let c = roster.add("C", Role::Don);
        roster.add("X", Role::Civilian);
        roster.add("Y", Role::Civilian);
        let outcome = resolve_night(
            &[
                action(a, NightActionKind::Kill, "X", 1),
                action(b, NightActionKind::Kill, "X", 2),
                action(c, NightActionKind::Kill, "Y", 3),
            ],
            &roster,
        );
        assert_eq!(outcome.killed.map(|p| p.name().to_string()), Some("X".into()));
    }

    #[test]
    fn test_don_immunity() {
        let t = table();
        let outcome = resolve_night(
            &[action(t.detective, NightActionKind::Check, "Vito", 1)],
            &t.roster,
        );
        assert_eq!(outcome.checks.len(), 1);
        assert!(!outcome.checks[0].is_mafia);
        assert!(outcome.checks[0].target.is_mafia_aligned());
    }

    #[test]
    fn test_check_finds_mafia() {
        let t = table();
        let outcome = resolve_night(
            &[action(t.detective, NightActionKind::Check, "Mia", 1)],
            &t.roster,
        );
        assert!(outcome.checks[0].is_mafia);
        assert_eq!(outcome.checks[0].detective, t.detective);
    }

    #[test]
    fn test_unknown_target_is_dropped_not_fatal() {
        let mut t = table();
        let cora = t.roster.find_by_name("Cora").unwrap().id();
        t.roster.mark_dead(cora);
        let outcome = resolve_night(
            &[
                action(t.don, NightActionKind::Kill, "Nobody", 1),
                action(t.detective, NightActionKind::Check, "Cora", 2),
                action(t.doctor, NightActionKind::Save, "Cal", 3),
            ],
            &t.roster,
        );
        assert!(outcome.killed.is_none());
        assert!(outcome.checks.is_empty());
        assert_eq!(outcome.not_found.len(), 2);
        assert_eq!(outcome.not_found[0].action, ActionKind::Kill);
        assert_eq!(outcome.not_found[1].action, ActionKind::Check);
        assert_eq!(outcome.saved.map(|p| p.name().to_string()), Some("Cal".into()));
    }
}
