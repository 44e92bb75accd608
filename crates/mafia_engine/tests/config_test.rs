//! Game configuration files and offline play.

use mafia_engine::{GameConfig, GameState, LlmProvider, Role};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const GAME: &str = r#"
[llm]
provider = "anthropic"
model = "claude-3-5-haiku-20241022"

[rules]
turn_timeout_secs = 5
day_discussion_rounds = 1
seed = 42

[prompts]
civilian = "You are a nervous baker."

[[players]]
name = "Vito"
role = "don"

[[players]]
name = "Sonny"
role = "mafia"

[[players]]
name = "Clara"
role = "detective"
model = "claude-3-5-sonnet-20241022"

[[players]]
name = "Hugo"
role = "doctor"

[[players]]
name = "Ann"
role = "civilian"
instructions = "Trust nobody."

[[players]]
name = "Ben"
role = "civilian"

[[players]]
name = "Iris"
role = "civilian"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(GAME);
    let config = GameConfig::from_file(file.path()).unwrap();

    assert_eq!(*config.llm().provider(), LlmProvider::Anthropic);
    assert_eq!(*config.llm().max_tokens(), 400);
    assert_eq!(config.players().len(), 7);
    assert_eq!(*config.players()[2].role(), Role::Detective);
    assert_eq!(
        config.players()[2].model().as_deref(),
        Some("claude-3-5-sonnet-20241022")
    );
    assert_eq!(config.prompts().civilian, "You are a nervous baker.");
    assert!(config.prompts().don.contains("DON"));

    let rules = config.session_rules();
    assert_eq!(rules.turn_timeout, Duration::from_secs(5));
    assert_eq!(rules.day_discussion_rounds, 1);
    assert!(rules.forbid_repeat_save);
    assert_eq!(rules.seed, Some(42));
}

#[test]
fn test_missing_file_is_an_error() {
    let result = GameConfig::from_file("/definitely/not/here/game.toml");
    let error = result.unwrap_err();
    assert!(error.message.contains("Failed to read config file"));
}

#[test]
fn test_offline_session_seats_everyone() {
    let config = GameConfig::from_toml_str(GAME).unwrap();
    let session = config.build_session(true).unwrap();
    assert_eq!(session.roster().len(), 7);
    assert!(session.validate_roster().is_ok());
    assert_eq!(session.status().alive_mafia, 2);
}

#[tokio::test]
async fn test_offline_game_reaches_a_verdict() {
    let config = GameConfig::from_toml_str(GAME).unwrap();
    let mut session = config.build_session(true).unwrap();

    let mut status = session.start().await.unwrap();
    for _ in 0..200 {
        if session.state() == GameState::Ended {
            break;
        }
        status = session.advance_phase().await.unwrap();
    }

    assert_eq!(session.state(), GameState::Ended);
    assert!(status.victor.is_some());
    assert!(status.summary().contains("wins!"));
}
