//! Operator-facing handle to a running session.
//!
//! A single task owns the [`GameSession`]. Commands reach it over a channel
//! and are answered one at a time. While a turn loop is running, anything
//! that would touch the session is refused with [`StateError::TurnInFlight`].

use crate::error::{GameError, StateError};
use crate::message_log::Sequence;
use crate::phase::GameState;
use crate::roster::PlayerId;
use crate::session::{GameSession, SessionSnapshot};
use crate::win::GameStatus;
use std::future::Future;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

type Reply<T> = oneshot::Sender<Result<T, GameError>>;

enum Command {
    Start(Reply<GameStatus>),
    Advance(Reply<GameStatus>),
    Restart(Reply<()>),
    KillPlayer(PlayerId, Reply<GameStatus>),
    ModeratorMessage(String, Reply<Sequence>),
    SetAutoAdvance(bool, Reply<()>),
    Snapshot(Reply<SessionSnapshot>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Advance(_) => "advance",
            Command::Restart(_) => "restart",
            Command::KillPlayer(..) => "kill_player",
            Command::ModeratorMessage(..) => "moderator_message",
            Command::SetAutoAdvance(..) => "set_auto_advance",
            Command::Snapshot(_) => "snapshot",
        }
    }
}

/// Cloneable handle for driving a session from anywhere.
#[derive(Debug, Clone)]
pub struct GameController {
    commands: mpsc::Sender<Command>,
    idle: watch::Receiver<bool>,
}

impl GameController {
    /// Moves `session` into a new task and returns a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(session))]
    pub fn spawn(session: GameSession) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (idle_tx, idle_rx) = watch::channel(true);
        let actor = SessionActor {
            session,
            commands: commands_rx,
            idle: idle_tx,
            auto_advance: false,
        };
        tokio::spawn(actor.run());
        info!("Game controller running");
        Self {
            commands: commands_tx,
            idle: idle_rx,
        }
    }

    /// See [`GameSession::start`].
    pub async fn start(&self) -> Result<GameStatus, GameError> {
        self.request(Command::Start).await
    }

    /// See [`GameSession::advance_phase`].
    pub async fn advance(&self) -> Result<GameStatus, GameError> {
        self.request(Command::Advance).await
    }

    /// See [`GameSession::restart`]. Also turns auto-advance off.
    pub async fn restart(&self) -> Result<(), GameError> {
        self.request(Command::Restart).await
    }

    /// See [`GameSession::kill_player`].
    pub async fn kill_player(&self, id: PlayerId) -> Result<GameStatus, GameError> {
        self.request(|reply| Command::KillPlayer(id, reply)).await
    }

    /// See [`GameSession::send_moderator_message`].
    pub async fn moderator_message(&self, text: impl Into<String>) -> Result<Sequence, GameError> {
        let text = text.into();
        self.request(|reply| Command::ModeratorMessage(text, reply))
            .await
    }

    /// Keeps advancing phases on its own until the game ends or this is
    /// switched off. Accepted even while a turn loop is running.
    pub async fn set_auto_advance(&self, enabled: bool) -> Result<(), GameError> {
        self.request(|reply| Command::SetAutoAdvance(enabled, reply))
            .await
    }

    /// See [`GameSession::snapshot`].
    pub async fn snapshot(&self) -> Result<SessionSnapshot, GameError> {
        self.request(Command::Snapshot).await
    }

    /// True while no turn loop is running.
    pub fn is_idle(&self) -> bool {
        *self.idle.borrow()
    }

    /// Watch channel that flips to false for the duration of each turn loop.
    pub fn idle(&self) -> watch::Receiver<bool> {
        self.idle.clone()
    }

    /// Waits until no turn loop is running.
    pub async fn wait_idle(&self) -> Result<(), GameError> {
        let mut idle = self.idle.clone();
        idle.wait_for(|idle| *idle)
            .await
            .map_err(|_| StateError::ControllerClosed)?;
        Ok(())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| StateError::ControllerClosed)?;
        reply_rx.await.map_err(|_| StateError::ControllerClosed)?
    }
}

struct SessionActor {
    session: GameSession,
    commands: mpsc::Receiver<Command>,
    idle: watch::Sender<bool>,
    auto_advance: bool,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            let command = if self.auto_advance && self.session.state() == GameState::Started {
                match self.commands.try_recv() {
                    Ok(command) => command,
                    Err(TryRecvError::Empty) => {
                        if let Err(e) = self.advance().await {
                            warn!(error = %e, "Auto-advance stopped");
                            self.auto_advance = false;
                        }
                        tokio::task::yield_now().await;
                        continue;
                    }
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.commands.recv().await {
                    Some(command) => command,
                    None => break,
                }
            };
            self.handle(command).await;
        }
        debug!("Game controller stopped");
    }

    async fn handle(&mut self, command: Command) {
        debug!(command = command.name(), "Handling command");
        match command {
            Command::Start(reply) => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            Command::Advance(reply) => {
                let result = self.advance().await;
                let _ = reply.send(result);
            }
            Command::Restart(reply) => {
                self.auto_advance = false;
                self.session.restart();
                let _ = reply.send(Ok(()));
            }
            Command::KillPlayer(id, reply) => {
                let _ = reply.send(self.session.kill_player(id));
            }
            Command::ModeratorMessage(text, reply) => {
                let _ = reply.send(self.session.send_moderator_message(&text));
            }
            Command::SetAutoAdvance(enabled, reply) => {
                info!(enabled, "Auto-advance toggled");
                self.auto_advance = enabled;
                let _ = reply.send(Ok(()));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(Ok(self.session.snapshot()));
            }
        }
    }

    async fn start(&mut self) -> Result<GameStatus, GameError> {
        let Self {
            session,
            commands,
            idle,
            auto_advance,
        } = self;
        busy(session.start(), commands, idle, auto_advance).await
    }

    async fn advance(&mut self) -> Result<GameStatus, GameError> {
        let Self {
            session,
            commands,
            idle,
            auto_advance,
        } = self;
        busy(session.advance_phase(), commands, idle, auto_advance).await
    }
}

/// Drives `work` to completion while refusing whatever else arrives.
async fn busy<T>(
    work: impl Future<Output = T>,
    commands: &mut mpsc::Receiver<Command>,
    idle: &watch::Sender<bool>,
    auto_advance: &mut bool,
) -> T {
    idle.send_replace(false);
    tokio::pin!(work);
    let output = loop {
        tokio::select! {
            biased;
            output = &mut work => break output,
            Some(command) = commands.recv() => refuse(command, auto_advance),
        }
    };
    idle.send_replace(true);
    output
}

fn refuse(command: Command, auto_advance: &mut bool) {
    debug!(command = command.name(), "Turn loop in flight");
    match command {
        Command::SetAutoAdvance(enabled, reply) => {
            info!(enabled, "Auto-advance toggled");
            *auto_advance = enabled;
            let _ = reply.send(Ok(()));
        }
        Command::Start(reply) | Command::Advance(reply) | Command::KillPlayer(_, reply) => {
            let _ = reply.send(in_flight());
        }
        Command::Restart(reply) => {
            let _ = reply.send(in_flight());
        }
        Command::ModeratorMessage(_, reply) => {
            let _ = reply.send(in_flight());
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(in_flight());
        }
    }
}

fn in_flight<T>() -> Result<T, GameError> {
    Err(StateError::TurnInFlight.into())
}
