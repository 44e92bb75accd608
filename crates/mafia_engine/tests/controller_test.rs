//! Operator controls served by `GameController`.

use mafia_engine::{
    ActionKind, DecisionResponse, GameController, GameError, GamePhase, GameSession, GameState,
    Role, ScriptedProvider, SessionRules, SessionSnapshot, StateError, Step,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn session(vito: ScriptedProvider) -> GameSession {
    let mut session = GameSession::new(SessionRules {
        seed: Some(3),
        ..SessionRules::default()
    });
    session.add_player("Vito", Role::Don, vito).unwrap();
    session
        .add_player("Ann", Role::Civilian, ScriptedProvider::new())
        .unwrap();
    session
        .add_player("Ben", Role::Civilian, ScriptedProvider::new())
        .unwrap();
    session
}

async fn wait_for_state(controller: &GameController, state: GameState) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(snapshot) = controller.snapshot().await {
                if snapshot.state == state {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("controller never reached the expected state")
}

#[tokio::test]
async fn test_commands_are_refused_while_a_turn_is_in_flight() {
    let gate = Arc::new(Notify::new());
    let vito = ScriptedProvider::new().during_step(
        GamePhase::Night,
        Step::Gate(gate.clone(), DecisionResponse::say("Patience.")),
    );
    let controller = GameController::spawn(session(vito));
    assert!(controller.is_idle());

    let starter = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start().await })
    };
    let mut idle = controller.idle();
    idle.wait_for(|idle| !*idle).await.unwrap();

    assert!(matches!(
        controller.advance().await,
        Err(GameError::State(StateError::TurnInFlight))
    ));
    assert!(matches!(
        controller.moderator_message("Hurry up.").await,
        Err(GameError::State(StateError::TurnInFlight))
    ));
    assert!(matches!(
        controller.snapshot().await,
        Err(GameError::State(StateError::TurnInFlight))
    ));

    gate.notify_one();
    let status = starter.await.unwrap().unwrap();
    assert_eq!(status.victor, None);
    controller.wait_idle().await.unwrap();

    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, GamePhase::Night);
    assert!(snapshot.messages.iter().any(|m| m.content == "Patience."));
    // The refused moderator message never reached the log.
    assert!(!snapshot.messages.iter().any(|m| m.content == "Hurry up."));
}

#[tokio::test]
async fn test_auto_advance_runs_until_the_game_ends() {
    let vito = ScriptedProvider::new().during(
        GamePhase::Actions,
        DecisionResponse::pass().with_action(ActionKind::Kill, "Ann"),
    );
    let controller = GameController::spawn(session(vito));

    controller.set_auto_advance(true).await.unwrap();
    controller.start().await.unwrap();

    let snapshot = wait_for_state(&controller, GameState::Ended).await;
    assert_eq!(snapshot.phase, GamePhase::Ended);
    assert!(snapshot
        .messages
        .iter()
        .any(|m| m.content == "Mafia wins! Survivors: Vito."));
    assert!(matches!(
        controller.advance().await,
        Err(GameError::State(StateError::GameEnded))
    ));
}

#[tokio::test]
async fn test_restart_and_moderator_controls() {
    let controller = GameController::spawn(session(ScriptedProvider::new()));

    assert!(matches!(
        controller.advance().await,
        Err(GameError::State(StateError::NotStarted))
    ));
    controller.start().await.unwrap();
    controller.moderator_message("Welcome, all.").await.unwrap();

    let snapshot = controller.snapshot().await.unwrap();
    let ben = snapshot
        .players
        .iter()
        .find(|p| p.name() == "Ben")
        .unwrap()
        .id();
    let status = controller.kill_player(ben).await.unwrap();
    assert_eq!(status.alive(), 2);

    controller.restart().await.unwrap();
    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.state, GameState::Initial);
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.players.iter().all(|p| p.is_alive()));
}
