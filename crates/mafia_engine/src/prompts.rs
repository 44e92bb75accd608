//! Instruction text handed to LLM-backed players.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Role instructions. Every field can be overridden from the game config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePrompts {
    /// Rules shared by every role.
    pub general_rules: String,
    /// Civilian instructions.
    pub civilian: String,
    /// Mafia instructions.
    pub mafia: String,
    /// Don instructions.
    pub don: String,
    /// Detective instructions.
    pub detective: String,
    /// Doctor instructions.
    pub doctor: String,
}

impl Default for RolePrompts {
    fn default() -> Self {
        Self {
            general_rules: "You are a player in a game of Mafia. By day the town discusses and \
                votes someone out. By night the mafia picks a victim while the detective and \
                doctor act in secret. Stay in character and keep replies short."
                .to_string(),
            civilian: "You are a CIVILIAN. Find the mafia through discussion and vote them out. \
                You have no night action."
                .to_string(),
            mafia: "You are MAFIA. Eliminate the town without being caught. Blend in by day \
                and agree on a victim with your partners at night."
                .to_string(),
            don: "You are the DON, leader of the mafia. The detective will see you as \
                innocent. Lead the night kill and stay hidden by day."
                .to_string(),
            detective: "You are the DETECTIVE. Each night you may check one player to learn \
                whether they are mafia. Share what you know carefully."
                .to_string(),
            doctor: "You are the DOCTOR. Each night you may protect one player from the \
                mafia. You cannot protect the same player two nights in a row."
                .to_string(),
        }
    }
}

impl RolePrompts {
    /// Instructions specific to `role`.
    pub fn for_role(&self, role: Role) -> &str {
        match role {
            Role::Civilian => &self.civilian,
            Role::Mafia => &self.mafia,
            Role::Don => &self.don,
            Role::Detective => &self.detective,
            Role::Doctor => &self.doctor,
        }
    }

    /// Full system prompt for a player.
    pub fn system_prompt(&self, name: &str, role: Role, custom: Option<&str>) -> String {
        let mut prompt = format!(
            "{}\n\nYour name is {}.\n\n{}",
            self.general_rules,
            name,
            self.for_role(role)
        );
        if let Some(custom) = custom.filter(|c| !c.trim().is_empty()) {
            prompt.push_str("\n\nAdditional instructions: ");
            prompt.push_str(custom.trim());
        }
        prompt.push_str(RESPONSE_FORMAT);
        prompt
    }
}

const RESPONSE_FORMAT: &str = "\n\nReply with a single JSON object and nothing else:\n\
{\"narrative\": \"what you say to the table\", \"actions\": [{\"type\": \"vote\", \"target\": \"Name\"}]}\n\
Action types are kill, check, save and vote. Only use the ones you are told are available. \
Use an empty list when you take no action.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_layers() {
        let prompts = RolePrompts::default();
        let prompt = prompts.system_prompt("Vito", Role::Don, Some("Speak like a poet."));
        assert!(prompt.starts_with(&prompts.general_rules));
        assert!(prompt.contains("Your name is Vito."));
        assert!(prompt.contains(&prompts.don));
        assert!(prompt.contains("Additional instructions: Speak like a poet."));
        assert!(prompt.contains("\"narrative\""));
    }

    #[test]
    fn test_blank_custom_instructions_are_skipped() {
        let prompt = RolePrompts::default().system_prompt("Ann", Role::Civilian, Some("  "));
        assert!(!prompt.contains("Additional instructions"));
    }
}
