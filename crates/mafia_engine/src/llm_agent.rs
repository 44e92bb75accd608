//! Decision provider backed by an LLM.

use crate::error::ProviderError;
use crate::llm_client::LlmClient;
use crate::phase::GamePhase;
use crate::provider::{DecisionProvider, DecisionRequest, DecisionResponse};
use std::fmt::Write as _;
use tracing::{debug, instrument, warn};

/// A player whose turns are written by a language model.
#[derive(Debug, Clone)]
pub struct LlmAgent {
    name: String,
    system_prompt: String,
    client: LlmClient,
}

impl LlmAgent {
    /// Creates an agent with a fully assembled system prompt.
    #[instrument(skip(system_prompt, client), fields(agent = %name))]
    pub fn new(name: String, system_prompt: String, client: LlmClient) -> Self {
        debug!(model = %client.config().model(), "Creating LLM agent");
        Self {
            name,
            system_prompt,
            client,
        }
    }
}

#[async_trait::async_trait]
impl DecisionProvider for LlmAgent {
    #[instrument(skip_all, fields(agent = %self.name, phase = %request.phase))]
    async fn decide(&self, request: &DecisionRequest) -> Result<DecisionResponse, ProviderError> {
        let user_message = render_turn(request);
        let text = self
            .client
            .generate(&self.system_prompt, &user_message)
            .await
            .map_err(|e| ProviderError::Transport(e.message))?;
        parse_response(&text)
    }

    fn label(&self) -> &str {
        self.client.config().model()
    }
}

/// Renders the table as the player sees it.
pub fn render_turn(request: &DecisionRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Phase: {}", request.phase);

    let players: Vec<String> = request
        .roster
        .iter()
        .map(|e| {
            if e.alive {
                e.name.clone()
            } else {
                format!("{} (dead)", e.name)
            }
        })
        .collect();
    let _ = writeln!(out, "Players: {}", players.join(", "));

    out.push_str("\nConversation so far:\n");
    if request.visible_messages.is_empty() {
        out.push_str("(nothing yet)\n");
    }
    for message in &request.visible_messages {
        let _ = writeln!(out, "{}", message.transcript_line());
    }

    let _ = writeln!(out, "\n{}", phase_hint(request.phase));
    if request.permitted_actions.is_empty() {
        out.push_str("You have no actions available this turn.\n");
    } else {
        let kinds: Vec<String> = request
            .permitted_actions
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(out, "Available actions this turn: {}", kinds.join(", "));
    }
    let _ = write!(out, "It is your turn, {}.", request.player_name);
    out
}

fn phase_hint(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::Night => "It is night. Talk with the rest of the mafia about who to kill.",
        GamePhase::Actions => "It is night. Use your night action now if you have one.",
        GamePhase::Day => "It is day. Discuss who you suspect.",
        GamePhase::Voting => "It is time to vote. Say why and cast your vote.",
        GamePhase::Welcome | GamePhase::Ended => "Wait for the moderator.",
    }
}

/// Parses a model reply.
///
/// Replies without any JSON object are treated as narrative only. A reply
/// that contains an object which does not parse is malformed.
pub fn parse_response(text: &str) -> Result<DecisionResponse, ProviderError> {
    let trimmed = text.trim();
    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        debug!("Reply has no JSON, using it as narrative");
        return Ok(DecisionResponse::say(trimmed));
    };
    if end < start {
        return Ok(DecisionResponse::say(trimmed));
    }

    serde_json::from_str::<DecisionResponse>(&trimmed[start..=end]).map_err(|e| {
        warn!(error = %e, "Could not parse model reply");
        ProviderError::Malformed(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ActionRequest};
    use crate::message_log::{MessageDraft, MessageLog};
    use crate::role::Role;
    use crate::roster::Roster;

    #[test]
    fn test_parse_plain_json() {
        let response = parse_response(
            r#"{"narrative": "It was Bob.", "actions": [{"type": "vote", "target": "Bob"}]}"#,
        )
        .unwrap();
        assert_eq!(response.narrative, "It was Bob.");
        assert_eq!(response.actions, vec![ActionRequest::new(ActionKind::Vote, "Bob")]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"narrative\": \"Quiet night.\"}\n```";
        let response = parse_response(text).unwrap();
        assert_eq!(response.narrative, "Quiet night.");
        assert!(response.actions.is_empty());
    }

    #[test]
    fn test_parse_prose() {
        let response = parse_response("  I think we should wait.  ").unwrap();
        assert_eq!(response.narrative, "I think we should wait.");
    }

    #[test]
    fn test_parse_broken_json_is_malformed() {
        let result = parse_response(r#"{"narrative": "oops", "actions": [{"type": "dance"}]}"#);
        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_render_turn() {
        let mut roster = Roster::new();
        roster.add("Ann", Role::Detective);
        let bob = roster.add("Bob", Role::Mafia);
        roster.mark_dead(bob);
        let mut log = MessageLog::new();
        log.append(MessageDraft::moderator("Welcome"));

        let request = DecisionRequest {
            player_name: "Ann".to_string(),
            role: Role::Detective,
            phase: GamePhase::Actions,
            visible_messages: log.all().to_vec(),
            roster: roster.entries(),
            permitted_actions: vec![ActionKind::Check],
        };
        let text = render_turn(&request);
        assert!(text.contains("Players: Ann, Bob (dead)"));
        assert!(text.contains("[Moderator]: Welcome"));
        assert!(text.contains("Available actions this turn: check"));
        assert!(text.ends_with("It is your turn, Ann."));
    }
}
