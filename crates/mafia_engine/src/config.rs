//! Game configuration loaded from TOML.

use crate::llm_agent::LlmAgent;
use crate::llm_client::{LlmClient, LlmConfig, LlmProvider};
use crate::prompts::RolePrompts;
use crate::provider::RandomAgent;
use crate::role::Role;
use crate::session::{GameSession, SessionRules};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A complete game description.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Language model settings shared by all players.
    #[serde(default)]
    llm: LlmSettings,

    /// Rule knobs.
    #[serde(default)]
    rules: RulesConfig,

    /// Role instruction overrides.
    #[serde(default)]
    prompts: RolePrompts,

    /// Seats, in order.
    #[serde(default)]
    players: Vec<PlayerConfig>,
}

/// Language model settings.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider (openrouter, openai or anthropic).
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// Default model for every player.
    #[serde(default = "default_model")]
    model: String,

    /// Maximum tokens per reply.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Rule knobs.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Seconds a player may think before passing.
    #[serde(default = "default_turn_timeout_secs")]
    turn_timeout_secs: u64,

    /// Discussion passes per day.
    #[serde(default = "default_day_discussion_rounds")]
    day_discussion_rounds: usize,

    /// Whether the doctor may protect the same player two nights running.
    #[serde(default = "default_forbid_repeat_save")]
    forbid_repeat_save: bool,

    /// Fixed seed for turn order and offline players.
    #[serde(default)]
    seed: Option<u64>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: default_turn_timeout_secs(),
            day_discussion_rounds: default_day_discussion_rounds(),
            forbid_repeat_save: default_forbid_repeat_save(),
            seed: None,
        }
    }
}

/// One seat.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Display name.
    name: String,

    /// Assigned role.
    role: Role,

    /// Model override for this player.
    #[serde(default)]
    model: Option<String>,

    /// Extra instructions appended to the role prompt.
    #[serde(default)]
    instructions: Option<String>,
}

#[instrument]
fn default_provider() -> LlmProvider {
    LlmProvider::OpenRouter
}

#[instrument]
fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

#[instrument]
fn default_max_tokens() -> u32 {
    400
}

fn default_turn_timeout_secs() -> u64 {
    60
}

fn default_day_discussion_rounds() -> usize {
    2
}

fn default_forbid_repeat_save() -> bool {
    true
}

impl GameConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(players = config.players.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Session rules described by the `[rules]` table.
    pub fn session_rules(&self) -> SessionRules {
        SessionRules {
            turn_timeout: Duration::from_secs(self.rules.turn_timeout_secs),
            day_discussion_rounds: self.rules.day_discussion_rounds,
            forbid_repeat_save: self.rules.forbid_repeat_save,
            seed: self.rules.seed,
        }
    }

    /// Seats every configured player in a new session.
    ///
    /// Offline sessions use random players and need no API key.
    #[instrument(skip(self), fields(players = self.players.len()))]
    pub fn build_session(&self, offline: bool) -> Result<GameSession, ConfigError> {
        let mut session = GameSession::new(self.session_rules());
        let api_key = if offline { None } else { Some(self.api_key()?) };

        for (index, player) in self.players.iter().enumerate() {
            let seated = match &api_key {
                None => {
                    let seed = self.rules.seed.map(|s| s.wrapping_add(index as u64 + 1));
                    session.add_player(&player.name, player.role, RandomAgent::new(&player.name, seed))
                }
                Some(key) => {
                    let model = player.model.clone().unwrap_or_else(|| self.llm.model.clone());
                    let client = LlmClient::new(LlmConfig::new(
                        self.llm.provider,
                        key.clone(),
                        model,
                        self.llm.max_tokens,
                    ));
                    let prompt = self.prompts.system_prompt(
                        &player.name,
                        player.role,
                        player.instructions.as_deref(),
                    );
                    session.add_player(
                        &player.name,
                        player.role,
                        LlmAgent::new(player.name.clone(), prompt, client),
                    )
                }
            };
            seated.map_err(|e| ConfigError::new(format!("Cannot seat {}: {}", player.name, e)))?;
        }
        Ok(session)
    }

    /// Reads the configured provider's API key from the environment.
    fn api_key(&self) -> Result<String, ConfigError> {
        let var = self.llm.provider.api_key_var();
        std::env::var(var)
            .map_err(|_| ConfigError::new(format!("{} environment variable not set", var)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_tables() {
        let config = GameConfig::from_toml_str(
            r#"
            [[players]]
            name = "Ann"
            role = "don"
            "#,
        )
        .unwrap();
        assert_eq!(*config.llm().provider(), LlmProvider::OpenRouter);
        assert_eq!(*config.llm().max_tokens(), 400);
        assert_eq!(config.session_rules(), SessionRules::default());
        assert_eq!(*config.players()[0].role(), Role::Don);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = GameConfig::from_toml_str(
            r#"
            [[players]]
            name = "Ann"
            role = "sheriff"
            "#,
        );
        assert!(result.is_err());
    }
}
