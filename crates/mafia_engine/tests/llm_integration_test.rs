//! Integration tests against real LLM endpoints.

use mafia_engine::{
    ActionKind, DecisionProvider, DecisionRequest, GamePhase, LlmAgent, LlmClient, LlmConfig,
    LlmProvider, Role, RolePrompts, RosterEntry,
};
use tracing::instrument;

fn entry(name: &str) -> RosterEntry {
    RosterEntry {
        name: name.to_string(),
        alive: true,
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openrouter_connectivity() {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("OPENROUTER_API_KEY").expect("OPENROUTER_API_KEY not set");
    let config = LlmConfig::new(
        LlmProvider::OpenRouter,
        api_key,
        "openai/gpt-4o-mini".to_string(),
        50,
    );
    let client = LlmClient::new(config);

    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_agent_casts_a_vote() {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("OPENROUTER_API_KEY").expect("OPENROUTER_API_KEY not set");
    let client = LlmClient::new(LlmConfig::new(
        LlmProvider::OpenRouter,
        api_key,
        "openai/gpt-4o-mini".to_string(),
        300,
    ));
    let prompt = RolePrompts::default().system_prompt("Ann", Role::Civilian, None);
    let agent = LlmAgent::new("Ann".to_string(), prompt, client);

    let request = DecisionRequest {
        player_name: "Ann".to_string(),
        role: Role::Civilian,
        phase: GamePhase::Voting,
        visible_messages: Vec::new(),
        roster: vec![entry("Ann"), entry("Ben"), entry("Vito")],
        permitted_actions: vec![ActionKind::Vote],
    };

    let response = agent.decide(&request).await.expect("Failed to decide");
    eprintln!("Response: {:?}", response);
    assert!(response.actions.iter().all(|a| a.kind == ActionKind::Vote));
}
