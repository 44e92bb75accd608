//! Players and the fixed roster they belong to.

use crate::role::{Faction, Role};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Unique identifier for a player within one roster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display("#{}", _0)]
pub struct PlayerId(pub u32);

/// A seat at the table.
///
/// Identity and role never change once created. Only the alive flag does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    role: Role,
    alive: bool,
}

impl Player {
    /// Player's unique ID.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name shown to other players.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigned role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the player is still in the game.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Shorthand for `self.role().is_mafia_aligned()`.
    pub fn is_mafia_aligned(&self) -> bool {
        self.role.is_mafia_aligned()
    }
}

/// Public view of a seat, as given to decision providers.
///
/// Deliberately omits the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name.
    pub name: String,
    /// Alive flag.
    pub alive: bool,
}

/// The ordered set of players in a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a living player and returns the assigned ID.
    #[instrument(skip(self, name), fields(name = %name.as_ref(), role = %role))]
    pub fn add(&mut self, name: impl AsRef<str>, role: Role) -> PlayerId {
        let id = PlayerId(self.players.len() as u32 + 1);
        debug!(player_id = %id, "Seating player");
        self.players.push(Player {
            id,
            name: name.as_ref().trim().to_string(),
            role,
            alive: true,
        });
        id
    }

    /// All players in seating order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Number of seats.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when nobody is seated.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Looks up a player by ID.
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Looks up a player by display name.
    ///
    /// Matching ignores surrounding whitespace and ASCII case, since names
    /// usually come back from a language model.
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        let wanted = name.trim();
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted))
    }

    /// Like [`Roster::find_by_name`] but only matches living players.
    pub fn find_alive_by_name(&self, name: &str) -> Option<&Player> {
        self.find_by_name(name).filter(|p| p.alive)
    }

    /// Living players in seating order.
    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// Living players belonging to `faction`.
    pub fn alive_in(&self, faction: Faction) -> impl Iterator<Item = &Player> {
        self.alive().filter(move |p| p.role.faction() == faction)
    }

    /// Living players with exactly `role`.
    pub fn alive_with_role(&self, role: Role) -> impl Iterator<Item = &Player> {
        self.alive().filter(move |p| p.role == role)
    }

    /// Names and alive flags for every seat.
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                name: p.name.clone(),
                alive: p.alive,
            })
            .collect()
    }

    /// Marks a player dead. Returns false if the ID is unknown or the
    /// player was already dead.
    #[instrument(skip(self))]
    pub fn mark_dead(&mut self, id: PlayerId) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) if player.alive => {
                player.alive = false;
                debug!(name = %player.name, "Player marked dead");
                true
            }
            _ => false,
        }
    }

    /// Brings every player back. Only used by a full restart.
    pub(crate) fn revive_all(&mut self) {
        for player in &mut self.players {
            player.alive = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut roster = Roster::new();
        let a = roster.add("Alice", Role::Don);
        let b = roster.add("Bob", Role::Civilian);
        assert_eq!(a, PlayerId(1));
        assert_eq!(b, PlayerId(2));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_find_by_name_is_lenient() {
        let mut roster = Roster::new();
        let id = roster.add("Alice", Role::Doctor);
        assert_eq!(roster.find_by_name("  alice ").map(Player::id), Some(id));
        assert!(roster.find_by_name("Alicia").is_none());
    }

    #[test]
    fn test_mark_dead_once() {
        let mut roster = Roster::new();
        let id = roster.add("Alice", Role::Civilian);
        assert!(roster.mark_dead(id));
        assert!(!roster.mark_dead(id));
        assert!(roster.find_alive_by_name("Alice").is_none());
        assert!(roster.find_by_name("Alice").is_some());
    }

    #[test]
    fn test_revive_all_keeps_roles() {
        let mut roster = Roster::new();
        let a = roster.add("Alice", Role::Mafia);
        roster.mark_dead(a);
        roster.revive_all();
        let alice = roster.get(a).unwrap();
        assert!(alice.is_alive());
        assert_eq!(alice.role(), Role::Mafia);
    }
}
