//! Append-only game transcript with per-message visibility.

use crate::action::ActionRequest;
use crate::roster::{Player, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Position of a message in the log. Strictly increasing.
pub type Sequence = u64;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    /// Engine announcements and diagnostics.
    System,
    /// The human operator.
    Moderator,
    /// One of the seated players.
    Player,
}

/// Which readers may see a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Everyone.
    Public,
    /// Mafia-aligned players only.
    MafiaChannel,
    /// A single player.
    PrivateTo(PlayerId),
}

impl Visibility {
    /// Returns true if `viewer` may read a message with this tag.
    pub fn admits(self, viewer: &Player) -> bool {
        match self {
            Visibility::Public => true,
            Visibility::MafiaChannel => viewer.is_mafia_aligned(),
            Visibility::PrivateTo(id) => viewer.id() == id,
        }
    }
}

/// A logged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the log.
    pub sequence: Sequence,
    /// Kind of sender.
    pub sender: SenderKind,
    /// Authoring player, for player messages.
    pub author: Option<PlayerId>,
    /// Author's display name at the time of writing.
    pub author_name: Option<String>,
    /// Text.
    pub content: String,
    /// Visibility tag.
    pub visibility: Visibility,
    /// Action this message records, if any.
    pub attached_action: Option<ActionRequest>,
    /// How long the decision provider took to produce this message.
    pub elapsed_ms: Option<u64>,
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Formats the message as a single transcript line.
    pub fn transcript_line(&self) -> String {
        let prefix = match (self.sender, &self.author_name) {
            (SenderKind::Player, Some(name)) => name.as_str(),
            (SenderKind::Player, None) => "Player",
            (SenderKind::Moderator, _) => "Moderator",
            (SenderKind::System, _) => "System",
        };
        let channel = match self.visibility {
            Visibility::Public => "",
            Visibility::MafiaChannel => " (mafia)",
            Visibility::PrivateTo(_) => " (private)",
        };
        format!("[{}{}]: {}", prefix, channel, self.content)
    }
}

/// A message that has not been sequenced yet.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    sender: SenderKind,
    author: Option<(PlayerId, String)>,
    content: String,
    visibility: Visibility,
    attached_action: Option<ActionRequest>,
    elapsed_ms: Option<u64>,
}

impl MessageDraft {
    /// An engine message.
    pub fn system(content: impl Into<String>, visibility: Visibility) -> Self {
        Self::build(SenderKind::System, None, content.into(), visibility)
    }

    /// A public operator message.
    pub fn moderator(content: impl Into<String>) -> Self {
        Self::build(SenderKind::Moderator, None, content.into(), Visibility::Public)
    }

    /// A message spoken by `author`.
    pub fn player(author: &Player, content: impl Into<String>, visibility: Visibility) -> Self {
        Self::build(
            SenderKind::Player,
            Some((author.id(), author.name().to_string())),
            content.into(),
            visibility,
        )
    }

    /// Attaches the action this message records.
    pub fn with_action(mut self, action: ActionRequest) -> Self {
        self.attached_action = Some(action);
        self
    }

    /// Records provider latency.
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    fn build(
        sender: SenderKind,
        author: Option<(PlayerId, String)>,
        content: String,
        visibility: Visibility,
    ) -> Self {
        Self {
            sender,
            author,
            content,
            visibility,
            attached_action: None,
            elapsed_ms: None,
        }
    }
}

/// The transcript of a game.
///
/// Sequence numbers keep increasing across [`MessageLog::clear`].
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_sequence: Sequence,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Sequences and stores a draft, returning the stored message.
    #[instrument(skip(self, draft), fields(sender = ?draft.sender, visibility = ?draft.visibility))]
    pub fn append(&mut self, draft: MessageDraft) -> &Message {
        let sequence = self.next_sequence;
        self.next_sequence = sequence + 1;
        let (author, author_name) = match draft.author {
            Some((id, name)) => (Some(id), Some(name)),
            None => (None, None),
        };
        debug!(sequence, "Appending message");
        self.messages.push(Message {
            sequence,
            sender: draft.sender,
            author,
            author_name,
            content: draft.content,
            visibility: draft.visibility,
            attached_action: draft.attached_action,
            elapsed_ms: draft.elapsed_ms,
            timestamp: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Every message, in order. Operator view.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The slice of history `viewer` is allowed to see, as an owned snapshot.
    pub fn visible_to(&self, viewer: &Player) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.visibility.admits(viewer))
            .cloned()
            .collect()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use crate::roster::Roster;

    fn table() -> Roster {
        let mut roster = Roster::new();
        for (name, role) in [
            ("Mia", Role::Mafia),
            ("Don", Role::Don),
            ("Cal", Role::Civilian),
            ("Dee", Role::Detective),
            ("Doc", Role::Doctor),
        ] {
            roster.add(name, role);
        }
        roster
    }

    #[test]
    fn test_sequences_strictly_increase() {
        let mut log = MessageLog::new();
        let a = log.append(MessageDraft::moderator("one")).sequence;
        let b = log.append(MessageDraft::moderator("two")).sequence;
        assert!(b > a);
        log.clear();
        let c = log.append(MessageDraft::moderator("three")).sequence;
        assert!(c > b);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_mafia_channel_visibility() {
        let roster = table();
        let mut log = MessageLog::new();
        let mia = roster.find_by_name("Mia").unwrap();
        log.append(MessageDraft::player(mia, "Let's get Cal", Visibility::MafiaChannel));

        for player in roster.players() {
            let visible = log.visible_to(player);
            if player.is_mafia_aligned() {
                assert_eq!(visible.len(), 1, "{} should see mafia chat", player.name());
            } else {
                assert!(visible.is_empty(), "{} must not see mafia chat", player.name());
            }
        }
    }

    #[test]
    fn test_private_visibility() {
        let roster = table();
        let mut log = MessageLog::new();
        let dee = roster.find_by_name("Dee").unwrap();
        log.append(MessageDraft::system("Mia is mafia", Visibility::PrivateTo(dee.id())));
        log.append(MessageDraft::moderator("Good morning"));

        for player in roster.players() {
            let expected = if player.id() == dee.id() { 2 } else { 1 };
            assert_eq!(log.visible_to(player).len(), expected);
        }
    }
}
