//! Mutable game state owned by the single orchestrating flow.

use crate::action::{NightActionBuffer, VoteBuffer};
use crate::events::GameEvent;
use crate::message_log::{MessageDraft, MessageLog, Sequence};
use crate::phase::GamePhase;
use crate::roster::{PlayerId, Roster};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Per-night bookkeeping that outlives a single turn.
#[derive(Debug, Clone, Default)]
pub(crate) struct NightContext {
    /// Order of the last mafia discussion round.
    pub discussion_order: Vec<PlayerId>,
    /// Player allowed to submit tonight's kill.
    pub final_word: Option<PlayerId>,
    /// Each doctor's protected player from the previous night.
    pub last_saves: HashMap<PlayerId, PlayerId>,
}

/// Roster, transcript and pending actions.
///
/// Only the session and the scheduler touch this, one call at a time.
#[derive(Debug)]
pub(crate) struct Table {
    pub roster: Roster,
    pub log: MessageLog,
    pub phase: GamePhase,
    /// Bumped on every phase change and restart.
    pub epoch: u64,
    pub night_number: u32,
    pub day_number: u32,
    pub night_actions: NightActionBuffer,
    pub votes: VoteBuffer,
    pub night: NightContext,
    events: Option<mpsc::UnboundedSender<GameEvent>>,
}

impl Table {
    pub fn new() -> Self {
        Self {
            roster: Roster::new(),
            log: MessageLog::new(),
            phase: GamePhase::Welcome,
            epoch: 0,
            night_number: 0,
            day_number: 0,
            night_actions: NightActionBuffer::new(),
            votes: VoteBuffer::new(),
            night: NightContext::default(),
            events: None,
        }
    }

    pub fn set_events(&mut self, events: mpsc::UnboundedSender<GameEvent>) {
        self.events = Some(events);
    }

    /// Appends to the log and notifies observers.
    pub fn post(&mut self, draft: MessageDraft) -> Sequence {
        let message = self.log.append(draft).clone();
        let sequence = message.sequence;
        self.emit(GameEvent::MessagePosted(message));
        sequence
    }

    pub fn emit(&self, event: GameEvent) {
        if let Some(events) = &self.events {
            // Observers may have gone away; the game does not depend on them.
            let _ = events.send(event);
        }
    }

    pub fn enter_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
        self.epoch += 1;
        match phase {
            GamePhase::Night => self.night_number += 1,
            GamePhase::Day => self.day_number += 1,
            _ => {}
        }
        self.emit(GameEvent::PhaseChanged(phase));
    }

    /// Returns everything to the pre-game state, keeping seats and roles.
    pub fn reset(&mut self) {
        self.roster.revive_all();
        self.log.clear();
        self.phase = GamePhase::Welcome;
        self.epoch += 1;
        self.night_number = 0;
        self.day_number = 0;
        self.night_actions.clear();
        self.votes.clear();
        self.night = NightContext::default();
        self.emit(GameEvent::Restarted);
    }
}
