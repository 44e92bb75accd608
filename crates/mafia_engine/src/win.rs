//! Win condition evaluation.

use crate::role::{Faction, Role};
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Seats held by one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
    /// Players dealt this role.
    pub total: usize,
    /// Of those, still alive.
    pub alive: usize,
}

/// Derived standing of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    /// Living Mafia and Don.
    pub alive_mafia: usize,
    /// Living Civilians, Detectives and Doctors.
    pub alive_town: usize,
    /// Winning faction, if the game is decided.
    pub victor: Option<Faction>,
    /// Seats at the table.
    pub total: usize,
    /// Breakdown by role.
    pub by_role: BTreeMap<Role, RoleCount>,
}

impl GameStatus {
    /// Living players.
    pub fn alive(&self) -> usize {
        self.alive_mafia + self.alive_town
    }

    /// Dead players.
    pub fn dead(&self) -> usize {
        self.total - self.alive()
    }

    /// Human-readable summary of the table.
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return "No players in the game yet.".to_string();
        }

        let mut lines = vec![format!(
            "Total players: {} (alive: {}, dead: {})",
            self.total,
            self.alive(),
            self.dead()
        )];

        let roles: Vec<String> = self
            .by_role
            .iter()
            .filter(|(_, count)| count.total > 0)
            .map(|(role, count)| format!("{}: {} (alive: {})", role, count.total, count.alive))
            .collect();
        lines.push(format!("By role: {}", roles.join(", ")));

        match self.victor {
            Some(Faction::Town) => lines.push("Town wins!".to_string()),
            Some(Faction::Mafia) => lines.push("Mafia wins!".to_string()),
            None => {}
        }
        lines.join("\n")
    }
}

/// Counts the living and decides whether a faction has won.
///
/// Town wins when no mafia remain and at least one town player lives. Mafia
/// wins once they are at least as many as the town.
#[instrument(skip_all)]
pub fn evaluate(roster: &Roster) -> GameStatus {
    let mut by_role: BTreeMap<Role, RoleCount> = BTreeMap::new();
    for player in roster.players() {
        let entry = by_role.entry(player.role()).or_default();
        entry.total += 1;
        if player.is_alive() {
            entry.alive += 1;
        }
    }

    let alive_mafia = roster.alive_in(Faction::Mafia).count();
    let alive_town = roster.alive_in(Faction::Town).count();

    let victor = if alive_mafia == 0 && alive_town > 0 {
        Some(Faction::Town)
    } else if alive_mafia > 0 && alive_mafia >= alive_town {
        Some(Faction::Mafia)
    } else {
        None
    };

    debug!(alive_mafia, alive_town, ?victor, "Evaluated win condition");
    GameStatus {
        alive_mafia,
        alive_town,
        victor,
        total: roster.len(),
        by_role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(roles: &[Role]) -> Roster {
        let mut roster = Roster::new();
        for (i, role) in roles.iter().enumerate() {
            roster.add(format!("P{}", i), *role);
        }
        roster
    }

    #[test]
    fn test_standard_table_continues() {
        let roster = seat(&[
            Role::Mafia,
            Role::Mafia,
            Role::Detective,
            Role::Civilian,
            Role::Civilian,
            Role::Civilian,
            Role::Civilian,
        ]);
        let status = evaluate(&roster);
        assert_eq!(status.alive_mafia, 2);
        assert_eq!(status.alive_town, 5);
        assert_eq!(status.victor, None);
    }

    #[test]
    fn test_town_wins_when_mafia_gone() {
        let mut roster = seat(&[Role::Don, Role::Civilian, Role::Doctor, Role::Detective]);
        let don = roster.players()[0].id();
        roster.mark_dead(don);
        let status = evaluate(&roster);
        assert_eq!(status.victor, Some(Faction::Town));
        assert_eq!(status.alive_town, 3);
    }

    #[test]
    fn test_mafia_wins_at_parity() {
        let mut roster = seat(&[Role::Mafia, Role::Civilian, Role::Civilian]);
        let civ = roster.players()[1].id();
        roster.mark_dead(civ);
        assert_eq!(evaluate(&roster).victor, Some(Faction::Mafia));
    }

    #[test]
    fn test_everyone_dead_is_undecided() {
        let mut roster = seat(&[Role::Mafia, Role::Civilian]);
        let ids: Vec<_> = roster.players().iter().map(|p| p.id()).collect();
        for id in ids {
            roster.mark_dead(id);
        }
        assert_eq!(evaluate(&roster).victor, None);
    }

    #[test]
    fn test_summary() {
        let mut roster = seat(&[Role::Mafia, Role::Civilian, Role::Civilian, Role::Doctor]);
        let mafia = roster.players()[0].id();
        roster.mark_dead(mafia);
        let summary = evaluate(&roster).summary();
        assert!(summary.contains("Total players: 4 (alive: 3, dead: 1)"));
        assert!(summary.contains("mafia: 1 (alive: 0)"));
        assert!(summary.ends_with("Town wins!"));
    }
}
