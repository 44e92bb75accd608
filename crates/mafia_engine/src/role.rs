//! Roles and factions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Role assigned to a player for the whole game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Ordinary town member with no night action.
    Civilian,
    /// Member of the mafia.
    Mafia,
    /// Mafia leader. Appears innocent to the detective.
    Don,
    /// Investigates one player per night.
    Detective,
    /// Protects one player per night.
    Doctor,
}

/// The two opposing sides of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Mafia and Don.
    Mafia,
    /// Civilian, Detective and Doctor.
    Town,
}

impl Role {
    /// Returns the faction this role plays for.
    pub fn faction(self) -> Faction {
        match self {
            Role::Mafia | Role::Don => Faction::Mafia,
            Role::Civilian | Role::Detective | Role::Doctor => Faction::Town,
        }
    }

    /// Returns true for Mafia and Don.
    pub fn is_mafia_aligned(self) -> bool {
        self.faction() == Faction::Mafia
    }

    /// What a detective learns when checking this role.
    ///
    /// The Don is immune and always reads as innocent.
    pub fn reads_as_mafia(self) -> bool {
        match self {
            Role::Don => false,
            other => other.is_mafia_aligned(),
        }
    }
}
